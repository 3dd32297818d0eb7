use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A seller-capable account as known to the identity collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SellerAccount {
    pub id: Uuid,
    pub display_name: String,
    pub gst_number: Option<rasayan_shared::pii::Masked<String>>,
    pub payout_enabled: bool,
}

#[async_trait]
pub trait SellerDirectory: Send + Sync {
    /// Resolve an account id to a seller-capable account, if one exists
    async fn resolve_seller(
        &self,
        account_id: Uuid,
    ) -> Result<Option<SellerAccount>, Box<dyn std::error::Error + Send + Sync>>;
}

/// Directory that accepts every id as a payout-enabled seller. Used in tests
/// and local runs where the identity collaborator is absent.
pub struct OpenSellerDirectory;

#[async_trait]
impl SellerDirectory for OpenSellerDirectory {
    async fn resolve_seller(
        &self,
        account_id: Uuid,
    ) -> Result<Option<SellerAccount>, Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!("Resolving seller account {} via open directory", account_id);
        Ok(Some(SellerAccount {
            id: account_id,
            display_name: format!("seller-{}", account_id.simple()),
            gst_number: None,
            payout_enabled: true,
        }))
    }
}
