use qce_core::{Friend, Group, QceResult};

use super::{QceClient, decode_list};
use crate::http::HttpBackend;

impl<B: HttpBackend> QceClient<B> {
    pub async fn groups(&self, page: u32, limit: u32, force_refresh: bool) -> QceResult<Vec<Group>> {
        let mut url = self.endpoint(&["api", "groups"]);
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string())
            .append_pair("forceRefresh", if force_refresh { "true" } else { "false" });
        let data = self.get_as(&url).await?;
        decode_list(data, "groups")
    }

    pub async fn friends(&self, page: u32, limit: u32) -> QceResult<Vec<Friend>> {
        let mut url = self.endpoint(&["api", "friends"]);
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("limit", &limit.to_string());
        let data = self.get_as(&url).await?;
        decode_list(data, "friends")
    }
}
