//! # 用量模块
//!
//! 原始用量记录的日汇总与仪表盘统计

pub mod aggregation;
pub mod dashboard;

pub use aggregation::{
    AggregationStats, DailyUsage, OrphanedGroup, UsageAggregationService, merge_tool_use,
    normalize_tool_key, tool_use_json,
};
pub use dashboard::{
    DEFAULT_TOP_N, DashboardMetrics, DashboardOverview, OTHER_LABEL, SeriesPoint,
    UsageDashboardService,
};
