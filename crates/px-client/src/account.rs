//! Account search.

use px_core::AccountId;
use px_core::json_util::lenient_i64;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::{ApiClient, ApiError};

const SEARCH_PATH: &str = "/api/Account/search";

/// Trading account as returned by the REST API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TradingAccount {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: AccountId,
    pub name: String,
    pub balance: f64,
    pub can_trade: bool,
    pub is_visible: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest {
    only_active_accounts: bool,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    accounts: Option<Vec<TradingAccount>>,
}

#[derive(Clone)]
pub struct AccountApi {
    api: ApiClient,
}

impl AccountApi {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn search_accounts(&self, only_active: bool) -> Result<Vec<TradingAccount>, ApiError> {
        let data: SearchData = self
            .api
            .post_json(SEARCH_PATH, &SearchRequest { only_active_accounts: only_active })
            .await?
            .into_result()?;
        let accounts = data.accounts.unwrap_or_default();
        debug!("[rest] {} account(s) found", accounts.len());
        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::api::ApiResponse;

    #[test]
    fn search_response_decodes_accounts() {
        let resp: ApiResponse<SearchData> = serde_json::from_value(json!({
            "success": true,
            "errorCode": 0,
            "accounts": [
                {"id": 465.0, "name": "PRAC-V2-1", "balance": 50000, "canTrade": true, "isVisible": true},
                {"id": 466, "name": "EXPRESS-2", "balance": 1234.5, "canTrade": false}
            ]
        }))
        .unwrap();
        let accounts = resp.into_result().unwrap().accounts.unwrap();
        assert_eq!(accounts.len(), 2);
        assert_eq!(accounts[0].id, 465);
        assert!(accounts[0].can_trade);
        assert!(!accounts[1].is_visible);
    }

    #[test]
    fn missing_account_list_is_empty() {
        let resp: ApiResponse<SearchData> = serde_json::from_value(json!({"success": true})).unwrap();
        assert!(resp.into_result().unwrap().accounts.is_none());
        assert_eq!(
            serde_json::to_value(SearchRequest { only_active_accounts: true }).unwrap(),
            json!({"onlyActiveAccounts": true})
        );
    }
}
