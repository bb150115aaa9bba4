use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub restaurants: Vec<SeedRestaurant>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedRestaurant {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub cuisine: String,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub foods: Vec<SeedFood>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedFood {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price_cents: u64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}
