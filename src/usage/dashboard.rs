//! # 用量仪表盘
//!
//! 每小时请求数、月内日活、服务商/模型排行、工具调用和汇总指标。
//! `usage_records` 不存在或为空时返回全零的占位数据。

use chrono::{Datelike, NaiveDate, NaiveDateTime};
use entity::{usage_records, usage_users_daily};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityName, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QuerySelect, sea_query::Expr,
};
use sea_orm_migration::SchemaManager;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use super::aggregation::{day_bounds, merge_tool_use};
use crate::error::{AdminError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ldebug, lerror, lwarn};

/// 排行默认保留的条目数
pub const DEFAULT_TOP_N: usize = 5;
/// 排行之外条目合并后的标签
pub const OTHER_LABEL: &str = "Other";

/// 图表数据点
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeriesPoint {
    pub label: String,
    pub value: i64,
}

impl SeriesPoint {
    fn new(label: impl Into<String>, value: i64) -> Self {
        Self {
            label: label.into(),
            value,
        }
    }
}

/// 汇总指标
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_requests: i64,
    pub requests_this_month: i64,
    pub average_daily_active_users: f64,
    pub active_users_today: i64,
    /// 今日活跃用户相对月均值的变化
    pub active_users_today_diff: String,
    pub max_daily_active_users: i64,
    /// 本月日活峰值相对上月峰值的变化
    pub max_daily_active_users_diff: String,
}

impl Default for DashboardMetrics {
    fn default() -> Self {
        Self {
            total_requests: 0,
            requests_this_month: 0,
            average_daily_active_users: 0.0,
            active_users_today: 0,
            active_users_today_diff: "0%".to_string(),
            max_daily_active_users: 0,
            max_daily_active_users_diff: "0%".to_string(),
        }
    }
}

/// 仪表盘数据
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardOverview {
    pub date: NaiveDate,
    /// 数据源缺失时为 true
    pub placeholder: bool,
    pub requests_per_hour: Vec<SeriesPoint>,
    pub daily_active_users: Vec<SeriesPoint>,
    pub requests_per_provider: Vec<SeriesPoint>,
    pub requests_per_model: Vec<SeriesPoint>,
    pub tool_usage: Vec<SeriesPoint>,
    pub metrics: DashboardMetrics,
}

impl DashboardOverview {
    /// 全零占位数据
    #[must_use]
    pub fn placeholder(today: NaiveDate) -> Self {
        let zeros = |labels: &[&str]| {
            labels
                .iter()
                .map(|label| SeriesPoint::new(*label, 0))
                .collect::<Vec<_>>()
        };

        Self {
            date: today,
            placeholder: true,
            requests_per_hour: hourly_series(&HashMap::new()),
            daily_active_users: month_days(today)
                .into_iter()
                .map(|day| SeriesPoint::new(day.format("%Y-%m-%d").to_string(), 0))
                .collect(),
            requests_per_provider: zeros(&["OpenAI", "Google", "Anthropic"]),
            requests_per_model: zeros(&["GPT-4", "Gemini", "Claude"]),
            tool_usage: Vec::new(),
            metrics: DashboardMetrics::default(),
        }
    }
}

#[derive(Debug, FromQueryResult)]
struct BucketRow {
    bucket: String,
    value: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct LatestRow {
    latest: Option<String>,
}

#[derive(Debug, FromQueryResult)]
struct ToolUseRow {
    server_tool_use: Option<String>,
}

/// 仪表盘服务
pub struct UsageDashboardService<'a> {
    db: &'a DatabaseConnection,
    top_n: usize,
}

impl<'a> UsageDashboardService<'a> {
    #[must_use]
    pub const fn new(db: &'a DatabaseConnection) -> Self {
        Self {
            db,
            top_n: DEFAULT_TOP_N,
        }
    }

    /// 设置排行条目数
    #[must_use]
    pub const fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// 生成指定日期的仪表盘
    ///
    /// 月内已汇总的日期读 `usage_users_daily`，之后的日期（包括今天）读 `usage_records`。
    pub async fn overview(&self, today: NaiveDate) -> Result<DashboardOverview> {
        if !self.has_usage_data().await? {
            lwarn!(
                "system",
                LogStage::Dashboard,
                LogComponent::Dashboard,
                "placeholder",
                "usage_records 不存在或为空，返回占位数据"
            );
            return Ok(DashboardOverview::placeholder(today));
        }

        let split = self.month_split(today).await?;
        ldebug!(
            "system",
            LogStage::Dashboard,
            LogComponent::Dashboard,
            "overview",
            &format!("生成仪表盘: {today}"),
            rollup_until = ?split.rollup_until
        );

        let requests_per_hour = self.requests_per_hour(today).await?;
        let daily_active_users = self.daily_active_users(today, &split).await?;
        let requests_per_provider = top_n_with_other(
            self.requests_by(&split, "api_provider").await?,
            self.top_n,
        );
        let requests_per_model =
            top_n_with_other(self.requests_by(&split, "model").await?, self.top_n);
        let tool_usage = self.tool_usage(&split).await?;

        let metrics = self.metrics(today, &split, &daily_active_users).await?;

        Ok(DashboardOverview {
            date: today,
            placeholder: false,
            requests_per_hour,
            daily_active_users,
            requests_per_provider,
            requests_per_model,
            tool_usage,
            metrics,
        })
    }

    async fn has_usage_data(&self) -> Result<bool> {
        let manager = SchemaManager::new(self.db);
        let exists = manager
            .has_table(usage_records::Entity.table_name())
            .await
            .map_err(|err| db_error("检查 usage_records 表失败", &err))?;
        if !exists {
            return Ok(false);
        }

        let count = usage_records::Entity::find()
            .count(self.db)
            .await
            .map_err(|err| db_error("统计用量记录失败", &err))?;
        Ok(count > 0)
    }

    /// 月份范围及日汇总覆盖到的最后一天
    async fn month_split(&self, day_in_month: NaiveDate) -> Result<MonthSplit> {
        let (start, end) = month_bounds(day_in_month)?;
        let latest = usage_users_daily::Entity::find()
            .select_only()
            .column_as(Expr::cust("MAX(strftime('%Y-%m-%d', date))"), "latest")
            .filter(usage_users_daily::Column::Date.gte(start))
            .filter(usage_users_daily::Column::Date.lt(end))
            .into_model::<LatestRow>()
            .one(self.db)
            .await
            .map_err(|err| db_error("查询日汇总范围失败", &err))?;

        let rollup_until = latest
            .and_then(|row| row.latest)
            .and_then(|raw| NaiveDate::parse_from_str(&raw, "%Y-%m-%d").ok());
        Ok(MonthSplit {
            start,
            end,
            rollup_until,
        })
    }

    /// 当天 24 个小时桶的请求数
    async fn requests_per_hour(&self, today: NaiveDate) -> Result<Vec<SeriesPoint>> {
        let (start, end) = day_bounds(today)?;
        let hour_expr = "strftime('%H', created_at)";

        let rows = usage_records::Entity::find()
            .select_only()
            .column_as(Expr::cust(hour_expr), "bucket")
            .column_as(Expr::cust("COUNT(*)"), "value")
            .filter(usage_records::Column::CreatedAt.gte(start))
            .filter(usage_records::Column::CreatedAt.lt(end))
            .group_by(Expr::cust(hour_expr))
            .into_model::<BucketRow>()
            .all(self.db)
            .await
            .map_err(|err| db_error("按小时统计请求失败", &err))?;

        let counts: HashMap<u32, i64> = rows
            .into_iter()
            .filter_map(|row| {
                row.bucket
                    .parse::<u32>()
                    .ok()
                    .map(|hour| (hour, row.value.unwrap_or(0)))
            })
            .collect();
        Ok(hourly_series(&counts))
    }

    /// 月内每天的去重活跃用户数
    async fn daily_active_users(
        &self,
        today: NaiveDate,
        split: &MonthSplit,
    ) -> Result<Vec<SeriesPoint>> {
        let counts = self.daily_active_counts(split).await?;
        Ok(month_days(today)
            .into_iter()
            .map(|day| {
                let label = day.format("%Y-%m-%d").to_string();
                let value = counts.get(&label).copied().unwrap_or(0);
                SeriesPoint::new(label, value)
            })
            .collect())
    }

    async fn daily_active_counts(&self, split: &MonthSplit) -> Result<HashMap<String, i64>> {
        let mut counts = HashMap::new();

        if let Some(until) = split.rollup_until {
            let day_expr = "strftime('%Y-%m-%d', date)";
            let rows = usage_users_daily::Entity::find()
                .select_only()
                .column_as(Expr::cust(day_expr), "bucket")
                .column_as(Expr::cust("COUNT(DISTINCT user_id)"), "value")
                .filter(usage_users_daily::Column::Date.gte(split.start))
                .filter(usage_users_daily::Column::Date.lte(until))
                .group_by(Expr::cust(day_expr))
                .into_model::<BucketRow>()
                .all(self.db)
                .await
                .map_err(|err| db_error("统计日汇总日活失败", &err))?;
            counts.extend(rows.into_iter().map(|row| (row.bucket, row.value.unwrap_or(0))));
        }

        if let Some((start, end)) = split.raw_range()? {
            let day_expr = "strftime('%Y-%m-%d', created_at)";
            let rows = usage_records::Entity::find()
                .select_only()
                .column_as(Expr::cust(day_expr), "bucket")
                .column_as(Expr::cust("COUNT(DISTINCT user_id)"), "value")
                .filter(usage_records::Column::UserId.is_not_null())
                .filter(usage_records::Column::CreatedAt.gte(start))
                .filter(usage_records::Column::CreatedAt.lt(end))
                .group_by(Expr::cust(day_expr))
                .into_model::<BucketRow>()
                .all(self.db)
                .await
                .map_err(|err| db_error("统计日活失败", &err))?;
            counts.extend(rows.into_iter().map(|row| (row.bucket, row.value.unwrap_or(0))));
        }

        Ok(counts)
    }

    /// 按服务商或模型统计月内请求数
    async fn requests_by(
        &self,
        split: &MonthSplit,
        dimension: &str,
    ) -> Result<Vec<(String, i64)>> {
        let mut totals: HashMap<String, i64> = HashMap::new();

        if let Some(until) = split.rollup_until {
            let rows = usage_users_daily::Entity::find()
                .select_only()
                .column_as(Expr::cust(dimension), "bucket")
                .column_as(Expr::cust("SUM(api_requests)"), "value")
                .filter(usage_users_daily::Column::Date.gte(split.start))
                .filter(usage_users_daily::Column::Date.lte(until))
                .group_by(Expr::cust(dimension))
                .into_model::<BucketRow>()
                .all(self.db)
                .await
                .map_err(|err| db_error("按维度统计日汇总失败", &err))?;
            for row in rows {
                *totals.entry(row.bucket).or_default() += row.value.unwrap_or(0);
            }
        }

        if let Some((start, end)) = split.raw_range()? {
            let bucket_expr = format!("COALESCE({dimension}, 'unknown')");
            let rows = usage_records::Entity::find()
                .select_only()
                .column_as(Expr::cust(bucket_expr.clone()), "bucket")
                .column_as(Expr::cust("COUNT(*)"), "value")
                .filter(usage_records::Column::CreatedAt.gte(start))
                .filter(usage_records::Column::CreatedAt.lt(end))
                .group_by(Expr::cust(bucket_expr))
                .into_model::<BucketRow>()
                .all(self.db)
                .await
                .map_err(|err| db_error("按维度统计请求失败", &err))?;
            for row in rows {
                *totals.entry(row.bucket).or_default() += row.value.unwrap_or(0);
            }
        }

        Ok(totals.into_iter().collect())
    }

    /// 月内按工具合计的调用次数
    async fn tool_usage(&self, split: &MonthSplit) -> Result<Vec<SeriesPoint>> {
        let mut raw_values = Vec::new();

        if let Some(until) = split.rollup_until {
            let rows = usage_users_daily::Entity::find()
                .select_only()
                .column(usage_users_daily::Column::ServerToolUse)
                .filter(usage_users_daily::Column::Date.gte(split.start))
                .filter(usage_users_daily::Column::Date.lte(until))
                .filter(usage_users_daily::Column::ServerToolUse.is_not_null())
                .into_model::<ToolUseRow>()
                .all(self.db)
                .await
                .map_err(|err| db_error("统计日汇总工具调用失败", &err))?;
            raw_values.extend(rows.into_iter().filter_map(|row| row.server_tool_use));
        }

        if let Some((start, end)) = split.raw_range()? {
            let rows = usage_records::Entity::find()
                .select_only()
                .column(usage_records::Column::ServerToolUse)
                .filter(usage_records::Column::CreatedAt.gte(start))
                .filter(usage_records::Column::CreatedAt.lt(end))
                .filter(usage_records::Column::ServerToolUse.is_not_null())
                .into_model::<ToolUseRow>()
                .all(self.db)
                .await
                .map_err(|err| db_error("统计工具调用失败", &err))?;
            raw_values.extend(rows.into_iter().filter_map(|row| row.server_tool_use));
        }

        let mut totals = BTreeMap::new();
        for raw in &raw_values {
            merge_tool_use(&mut totals, raw);
        }

        let mut series: Vec<SeriesPoint> = totals
            .into_iter()
            .filter(|(_, count)| *count != 0)
            .map(|(tool, count)| SeriesPoint::new(tool, count))
            .collect();
        series.sort_by(|a, b| b.value.cmp(&a.value).then_with(|| a.label.cmp(&b.label)));
        Ok(series)
    }

    async fn metrics(
        &self,
        today: NaiveDate,
        split: &MonthSplit,
        daily_active_users: &[SeriesPoint],
    ) -> Result<DashboardMetrics> {
        let total_requests = usage_records::Entity::find()
            .count(self.db)
            .await
            .map_err(|err| db_error("统计请求总数失败", &err))?;

        let (start, _) = day_bounds(split.start)?;
        let (end, _) = day_bounds(split.end)?;
        let requests_this_month = usage_records::Entity::find()
            .filter(usage_records::Column::CreatedAt.gte(start))
            .filter(usage_records::Column::CreatedAt.lt(end))
            .count(self.db)
            .await
            .map_err(|err| db_error("统计本月请求失败", &err))?;

        let today_label = today.format("%Y-%m-%d").to_string();
        let active_users_today = daily_active_users
            .iter()
            .find(|point| point.label == today_label)
            .map_or(0, |point| point.value);

        // 只统计截至今天的天数
        let elapsed: Vec<i64> = daily_active_users
            .iter()
            .filter(|point| point.label <= today_label)
            .map(|point| point.value)
            .collect();
        let average_daily_active_users = if elapsed.is_empty() {
            0.0
        } else {
            let sum: i64 = elapsed.iter().sum();
            (ratio_component(sum) / ratio_component(usize_to_i64(elapsed.len())) * 10.0).round()
                / 10.0
        };

        let max_daily_active_users = daily_active_users
            .iter()
            .map(|point| point.value)
            .max()
            .unwrap_or(0);

        let previous_month_day = split
            .start
            .pred_opt()
            .ok_or_else(|| AdminError::internal("无法计算上月日期"))?;
        let previous_split = self.month_split(previous_month_day).await?;
        let previous_max = self
            .daily_active_counts(&previous_split)
            .await?
            .into_values()
            .max()
            .unwrap_or(0);

        Ok(DashboardMetrics {
            total_requests: u64_to_i64(total_requests),
            requests_this_month: u64_to_i64(requests_this_month),
            average_daily_active_users,
            active_users_today,
            active_users_today_diff: calculate_growth_rate_f64(
                ratio_component(active_users_today),
                average_daily_active_users,
            ),
            max_daily_active_users,
            max_daily_active_users_diff: calculate_growth_rate(
                max_daily_active_users,
                previous_max,
            ),
        })
    }
}

/// 一个月的统计范围：`rollup_until` 及之前读日汇总，之后读原始记录
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MonthSplit {
    start: NaiveDate,
    /// 下月第一天
    end: NaiveDate,
    rollup_until: Option<NaiveDate>,
}

impl MonthSplit {
    /// 需要读原始记录的时间范围，日汇总已覆盖整月时为 `None`
    fn raw_range(&self) -> Result<Option<(NaiveDateTime, NaiveDateTime)>> {
        let from = self
            .rollup_until
            .and_then(|until| until.succ_opt())
            .map_or(self.start, |next| next.max(self.start));
        if from >= self.end {
            return Ok(None);
        }
        let (start, _) = day_bounds(from)?;
        let (end, _) = day_bounds(self.end)?;
        Ok(Some((start, end)))
    }
}

/// 24 个 `HH:00` 小时桶
fn hourly_series(counts: &HashMap<u32, i64>) -> Vec<SeriesPoint> {
    (0..24)
        .map(|hour| {
            SeriesPoint::new(
                format!("{hour:02}:00"),
                counts.get(&hour).copied().unwrap_or(0),
            )
        })
        .collect()
}

/// 当月第一天与下月第一天
fn month_bounds(date: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let start = NaiveDate::from_ymd_opt(date.year(), date.month(), 1);
    let next = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    start
        .zip(next)
        .ok_or_else(|| AdminError::validation(format!("日期超出范围: {date}")))
}

/// 当月的每一天
fn month_days(date: NaiveDate) -> Vec<NaiveDate> {
    let Ok((start, next)) = month_bounds(date) else {
        return Vec::new();
    };
    start.iter_days().take_while(|day| *day < next).collect()
}

/// 保留前 `top_n` 项，其余合并为 `Other`
fn top_n_with_other(mut counts: Vec<(String, i64)>, top_n: usize) -> Vec<SeriesPoint> {
    counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    let other: i64 = counts.iter().skip(top_n).map(|(_, count)| count).sum();
    let mut series: Vec<SeriesPoint> = counts
        .into_iter()
        .take(top_n)
        .map(|(label, count)| SeriesPoint::new(label, count))
        .collect();

    if other > 0 {
        series.push(SeriesPoint::new(OTHER_LABEL, other));
    }
    series
}

fn usize_to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn u64_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn ratio_component(value: i64) -> f64 {
    let clamped = value.clamp(0, i64::from(i32::MAX));
    let limited = i32::try_from(clamped).unwrap_or(i32::MAX);
    f64::from(limited)
}

fn calculate_growth_rate(current: i64, previous: i64) -> String {
    calculate_growth_rate_f64(ratio_component(current), ratio_component(previous))
}

fn calculate_growth_rate_f64(current: f64, previous: f64) -> String {
    if previous == 0.0 {
        if current > 0.0 {
            "+100%".to_string()
        } else {
            "0%".to_string()
        }
    } else {
        let rate = ((current - previous) / previous) * 100.0;
        if rate > 0.0 {
            format!("+{rate:.1}%")
        } else {
            format!("{rate:.1}%")
        }
    }
}

fn db_error(message: &str, err: &DbErr) -> AdminError {
    lerror!(
        "system",
        LogStage::Db,
        LogComponent::Dashboard,
        "dashboard_db_error",
        &format!("{message}: {err}")
    );
    crate::error!(Database, format!("{message}: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(10, 0, "+100%")]
    #[case(0, 0, "0%")]
    #[case(15, 10, "+50.0%")]
    #[case(9, 10, "-10.0%")]
    #[case(10, 10, "0.0%")]
    fn test_growth_rate(#[case] current: i64, #[case] previous: i64, #[case] expected: &str) {
        assert_eq!(calculate_growth_rate(current, previous), expected);
    }

    #[test]
    fn test_month_bounds_and_days() {
        assert_eq!(
            month_bounds(date(2024, 12, 15)).unwrap(),
            (date(2024, 12, 1), date(2025, 1, 1))
        );
        assert_eq!(month_days(date(2024, 2, 10)).len(), 29);
        assert_eq!(month_days(date(2025, 4, 30)).len(), 30);
    }

    #[test]
    fn test_month_split_raw_range() {
        let split = |until: Option<NaiveDate>| MonthSplit {
            start: date(2025, 3, 1),
            end: date(2025, 4, 1),
            rollup_until: until,
        };
        let at = |d: NaiveDate| d.and_hms_opt(0, 0, 0).unwrap();

        assert_eq!(
            split(None).raw_range().unwrap(),
            Some((at(date(2025, 3, 1)), at(date(2025, 4, 1))))
        );
        assert_eq!(
            split(Some(date(2025, 3, 9))).raw_range().unwrap(),
            Some((at(date(2025, 3, 10)), at(date(2025, 4, 1))))
        );
        assert_eq!(split(Some(date(2025, 3, 31))).raw_range().unwrap(), None);
    }

    #[test]
    fn test_top_n_with_other() {
        let counts = vec![
            ("a".to_string(), 1),
            ("b".to_string(), 5),
            ("c".to_string(), 3),
            ("d".to_string(), 2),
        ];
        let series = top_n_with_other(counts, 2);
        assert_eq!(
            series,
            vec![
                SeriesPoint::new("b", 5),
                SeriesPoint::new("c", 3),
                SeriesPoint::new(OTHER_LABEL, 3),
            ]
        );

        let short = top_n_with_other(vec![("x".to_string(), 4)], 5);
        assert_eq!(short, vec![SeriesPoint::new("x", 4)]);
    }

    #[test]
    fn test_placeholder_shape() {
        let overview = DashboardOverview::placeholder(date(2025, 3, 14));
        assert!(overview.placeholder);
        assert_eq!(overview.requests_per_hour.len(), 24);
        assert_eq!(overview.requests_per_hour[0].label, "00:00");
        assert_eq!(overview.requests_per_hour[23].label, "23:00");
        assert!(overview.requests_per_hour.iter().all(|p| p.value == 0));
        assert_eq!(overview.daily_active_users.len(), 31);
        assert_eq!(overview.daily_active_users[0].label, "2025-03-01");

        let providers: Vec<_> = overview
            .requests_per_provider
            .iter()
            .map(|p| p.label.as_str())
            .collect();
        assert_eq!(providers, vec!["OpenAI", "Google", "Anthropic"]);
        let models: Vec<_> = overview
            .requests_per_model
            .iter()
            .map(|p| p.label.as_str())
            .collect();
        assert_eq!(models, vec!["GPT-4", "Gemini", "Claude"]);
        assert_eq!(overview.metrics, DashboardMetrics::default());
    }
}
