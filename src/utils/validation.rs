use crate::config::Config;
use anyhow::{anyhow, Result};

const MAX_USER_ID_LEN: usize = 128;

pub fn validate_user_id(user_id: &str) -> Result<()> {
    if user_id.trim().is_empty() {
        return Err(anyhow!("User ID cannot be empty"));
    }

    if user_id.len() > MAX_USER_ID_LEN {
        return Err(anyhow!("User ID too long (max {} characters)", MAX_USER_ID_LEN));
    }

    if user_id.chars().any(char::is_control) {
        return Err(anyhow!("User ID contains control characters"));
    }

    Ok(())
}

pub fn validate_config(config: &Config) -> Result<()> {
    let training = &config.training;

    if training.embedding_dim == 0 {
        return Err(anyhow!("Embedding dimension must be positive"));
    }

    if training.embedding_dim > 2048 {
        return Err(anyhow!("Embedding dimension too large (max 2048)"));
    }

    if training.epochs == 0 {
        return Err(anyhow!("Epoch count must be positive"));
    }

    if training.batch_size == 0 {
        return Err(anyhow!("Batch size must be positive"));
    }

    if !training.learning_rate.is_finite() || training.learning_rate <= 0.0 {
        return Err(anyhow!("Learning rate must be a positive finite number"));
    }

    if !training.init_scale.is_finite() || training.init_scale <= 0.0 {
        return Err(anyhow!("Init scale must be a positive finite number"));
    }

    if config.recommendation.freshness_window_hours < 0 {
        return Err(anyhow!("Freshness window cannot be negative"));
    }

    Ok(())
}
