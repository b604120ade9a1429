//! Assets attached to a record

use serde::{Deserialize, Serialize};

/// A named, URL-addressable file attached to a record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub url: String,
}

impl Asset {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

/// Ordered asset list with unique URLs and unique names.
///
/// Order is insertion order. An asset whose URL or name is already present
/// is never added; the first occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Asset>", into = "Vec<Asset>")]
pub struct AssetList(Vec<Asset>);

impl AssetList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Asset> {
        self.0.iter()
    }

    pub fn as_slice(&self) -> &[Asset] {
        &self.0
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.0.iter().any(|a| a.url == url)
    }

    pub fn contains_name(&self, name: &str) -> bool {
        self.0.iter().any(|a| a.name == name)
    }

    pub fn find_by_url(&self, url: &str) -> Option<&Asset> {
        self.0.iter().find(|a| a.url == url)
    }

    /// Appends `asset` unless its URL or name is already present.
    pub fn push(&mut self, asset: Asset) -> bool {
        if self.contains_url(&asset.url) || self.contains_name(&asset.name) {
            tracing::debug!(name = %asset.name, url = %asset.url, "duplicate asset dropped");
            return false;
        }
        self.0.push(asset);
        true
    }

    /// New list with `incoming` appended after the current assets.
    pub fn concat(&self, incoming: impl IntoIterator<Item = Asset>) -> Self {
        let mut next = self.clone();
        for asset in incoming {
            next.push(asset);
        }
        next
    }

    /// New list without the asset stored at `url`.
    pub fn without_url(&self, url: &str) -> Self {
        Self(self.0.iter().filter(|a| a.url != url).cloned().collect())
    }

    pub fn urls(&self) -> Vec<&str> {
        self.0.iter().map(|a| a.url.as_str()).collect()
    }
}

impl From<Vec<Asset>> for AssetList {
    fn from(assets: Vec<Asset>) -> Self {
        AssetList::new().concat(assets)
    }
}

impl From<AssetList> for Vec<Asset> {
    fn from(list: AssetList) -> Self {
        list.0
    }
}

impl FromIterator<Asset> for AssetList {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        AssetList::new().concat(iter)
    }
}

impl<'a> IntoIterator for &'a AssetList {
    type Item = &'a Asset;
    type IntoIter = std::slice::Iter<'a, Asset>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
