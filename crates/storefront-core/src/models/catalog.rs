use serde::{Deserialize, Deserializer, Serialize};

/// Prices travel as decimal strings ("1299.00") but some endpoints and
/// older payloads send plain numbers. Accept both.
pub(crate) fn de_price<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Price {
        Number(f64),
        Text(String),
    }

    match Price::deserialize(deserializer)? {
        Price::Number(n) => Ok(n),
        Price::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid price: {}", s))),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Category {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductImage {
    pub id: i64,
    pub image: String,
    #[serde(default)]
    pub alt_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub article: String,
    #[serde(deserialize_with = "de_price")]
    pub price: f64,
    #[serde(default)]
    pub specifications: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub images: Vec<ProductImage>,
}

impl Product {
    pub fn category_id(&self) -> Option<i64> {
        self.category.as_ref().map(|c| c.id)
    }

    /// Case-insensitive match against name, article and description
    pub fn matches(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self.article.to_lowercase().contains(&needle)
            || self
                .description
                .as_deref()
                .map(|d| d.to_lowercase().contains(&needle))
                .unwrap_or(false)
    }
}

/// Fields for `POST products/`. The backend reads these as form fields.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub category_id: i64,
    pub article: String,
    pub price: f64,
    pub specifications: Option<String>,
    pub description: Option<String>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("Product name is required".to_string());
        }
        if self.article.trim().is_empty() {
            return Err("Product article is required".to_string());
        }
        validate_price(self.price)
    }

    pub fn form_fields(&self) -> Vec<(String, String)> {
        let update = ProductUpdate {
            name: Some(self.name.clone()),
            category_id: Some(self.category_id),
            article: Some(self.article.clone()),
            price: Some(self.price),
            specifications: self.specifications.clone(),
            description: self.description.clone(),
        };
        update.form_fields()
    }
}

/// Partial change for `PATCH products/{id}/`; `None` fields are left alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category_id: Option<i64>,
    pub article: Option<String>,
    pub price: Option<f64>,
    pub specifications: Option<String>,
    pub description: Option<String>,
}

impl ProductUpdate {
    pub fn is_empty(&self) -> bool {
        self.form_fields().is_empty()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.is_empty() {
            return Err("Nothing to update".to_string());
        }
        if self.name.as_deref().is_some_and(|n| n.trim().is_empty()) {
            return Err("Product name cannot be empty".to_string());
        }
        if self.article.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err("Product article cannot be empty".to_string());
        }
        self.price.map_or(Ok(()), validate_price)
    }

    pub fn form_fields(&self) -> Vec<(String, String)> {
        let mut fields = Vec::new();
        if let Some(ref name) = self.name {
            fields.push(("name".to_string(), name.trim().to_string()));
        }
        if let Some(id) = self.category_id {
            fields.push(("category_id".to_string(), id.to_string()));
        }
        if let Some(ref article) = self.article {
            fields.push(("article".to_string(), article.trim().to_string()));
        }
        if let Some(price) = self.price {
            fields.push(("price".to_string(), format!("{:.2}", price)));
        }
        if let Some(ref specifications) = self.specifications {
            fields.push(("specifications".to_string(), specifications.clone()));
        }
        if let Some(ref description) = self.description {
            fields.push(("description".to_string(), description.clone()));
        }
        fields
    }
}

fn validate_price(price: f64) -> Result<(), String> {
    if price.is_finite() && price >= 0.0 {
        Ok(())
    } else {
        Err(format!("Invalid price: {}", price))
    }
}
