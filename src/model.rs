use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CategoryId(pub String);

impl CategoryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CategoryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub rating: f64,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default, alias = "user")]
    pub author: Option<String>,
}

/// Category membership as the backend sends it: either a bare id or the
/// populated category document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CategoryRef {
    Id(CategoryId),
    Embedded {
        #[serde(alias = "_id")]
        id: CategoryId,
        #[serde(default)]
        name: Option<String>,
    },
}

impl CategoryRef {
    pub fn id(&self) -> &CategoryId {
        match self {
            CategoryRef::Id(id) => id,
            CategoryRef::Embedded { id, .. } => id,
        }
    }

    pub fn embedded_name(&self) -> Option<&str> {
        match self {
            CategoryRef::Id(_) => None,
            CategoryRef::Embedded { name, .. } => name.as_deref(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(alias = "_id")]
    pub id: CategoryId,
    pub name: String,
}

/// Product record exactly as fetched, before any derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProduct {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub description: String,
    pub selling_price: f64,
    #[serde(default, deserialize_with = "percentage_as_text")]
    pub sale_percentage: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub reviews: Vec<Review>,
    #[serde(default)]
    pub categories: Vec<CategoryRef>,
    #[serde(default)]
    pub stock: Option<u32>,
}

/// Upstream sends the sale percentage as a decimal string, occasionally as a
/// plain number. Both are kept as text so parsing happens in one place.
fn percentage_as_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Wire {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Wire>::deserialize(deserializer)?.map(|wire| match wire {
        Wire::Text(text) => text,
        Wire::Number(number) => number.to_string(),
    }))
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", content = "stars", rename_all = "snake_case")]
pub enum Rating {
    /// No reviews yet. Distinct from a genuine zero-star average.
    Unrated,
    Stars(f64),
}

impl Rating {
    pub fn stars(&self) -> Option<f64> {
        match self {
            Rating::Unrated => None,
            Rating::Stars(value) => Some(*value),
        }
    }

    pub fn is_rated(&self) -> bool {
        matches!(self, Rating::Stars(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            StockStatus::InStock => "In stock",
            StockStatus::LowStock => "Low stock",
            StockStatus::OutOfStock => "Out of stock",
        }
    }

    /// Display color as a hex RGB string.
    pub const fn color(&self) -> &'static str {
        match self {
            StockStatus::InStock => "#2E7D32",
            StockStatus::LowStock => "#F9A825",
            StockStatus::OutOfStock => "#C62828",
        }
    }
}

impl std::fmt::Display for StockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A product with its presentation fields computed once at snapshot build.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(flatten)]
    pub raw: RawProduct,
    pub discounted_price: f64,
    pub average_rating: Rating,
    pub stock_status: StockStatus,
    pub on_sale: bool,
}

impl Product {
    pub fn id(&self) -> &ProductId {
        &self.raw.id
    }

    pub fn name(&self) -> &str {
        &self.raw.name
    }

    pub fn brand(&self) -> &str {
        &self.raw.brand
    }

    pub fn selling_price(&self) -> f64 {
        self.raw.selling_price
    }

    pub fn in_category(&self, category: &CategoryId) -> bool {
        self.raw.categories.iter().any(|c| c.id() == category)
    }
}

/// Response bodies come either as a bare array or wrapped in `{ "data": [...] }`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Bare(Vec<T>),
    Enveloped { data: Vec<T> },
}

impl<T> ListPayload<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListPayload::Bare(items) => items,
            ListPayload::Enveloped { data } => data,
        }
    }
}
