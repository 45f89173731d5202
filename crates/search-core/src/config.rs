// search-core/src/config.rs
//! 搜索控制器配置

use serde::{Deserialize, Serialize};

/// Lives under the `[search]` table of the client config.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct SearchConfig {
    /// 最近查询保留条数
    pub recent_queries_capacity: usize,
    /// 建议列表显示条数
    pub suggestions_to_show: usize,
    /// 关闭后不再显示缓存的结果页
    pub response_cache: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            recent_queries_capacity: 10,
            suggestions_to_show: 10,
            response_cache: true,
        }
    }
}
