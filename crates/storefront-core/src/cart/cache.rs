use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tracing::debug;

use super::store::Cart;

/// Cart file name in the data directory
const CART_FILE: &str = "cart.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Saved<T> {
    pub data: T,
    pub saved_at: DateTime<Utc>,
}

impl<T> Saved<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            saved_at: Utc::now(),
        }
    }

    pub fn age_minutes(&self) -> i64 {
        (Utc::now() - self.saved_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", (minutes + 30) / 60)
        } else {
            format!("{}d ago", (minutes + 720) / 1440)
        }
    }
}

/// Keeps the cart between runs
pub struct CartCache {
    path: PathBuf,
}

impl CartCache {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            path: data_dir.join(CART_FILE),
        }
    }

    fn load_file<T: DeserializeOwned>(&self) -> Result<Option<Saved<T>>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read cart file {}", self.path.display()))?;
        let saved = serde_json::from_str(&contents).context("Failed to parse cart file")?;
        Ok(Some(saved))
    }

    pub fn load(&self) -> Result<Option<Saved<Cart>>> {
        self.load_file()
    }

    /// The saved cart, or an empty one
    pub fn load_or_default(&self) -> Cart {
        match self.load() {
            Ok(Some(saved)) => saved.data,
            Ok(None) => Cart::default(),
            Err(e) => {
                debug!(error = %e, "Ignoring unreadable cart file");
                Cart::default()
            }
        }
    }

    pub fn save(&self, cart: &Cart) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(&Saved::new(cart))?;
        std::fs::write(&self.path, contents)?;
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
