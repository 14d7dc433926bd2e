//! # 用量日汇总
//!
//! 按 (user_id, date, api_provider, model) 对 `usage_records` 做 GROUP BY，
//! 结果按唯一键写入 `usage_users_daily`，重复执行结果不变。

use chrono::{Days, NaiveDate, NaiveDateTime, Utc};
use entity::{usage_records, usage_users_daily};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult,
    IntoActiveModel, Order, QueryFilter, QueryOrder, QuerySelect, Set, sea_query::Expr,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::error::{AdminError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::{ensure_validation, ldebug, lerror, linfo};

const PROVIDER_EXPR: &str = "COALESCE(api_provider, 'unknown')";
const DAY_EXPR: &str = "strftime('%Y-%m-%d', created_at)";

/// 工具调用键归一化：不同服务商的联网搜索统计为 `web_search`
#[must_use]
pub fn normalize_tool_key(key: &str) -> &str {
    match key {
        "web_search_requests" | "grounding_queries" | "web_search" => "web_search",
        other => other,
    }
}

/// 将一条 `server_tool_use` JSON 按键累加进 `totals`，非对象或非整数值被忽略
pub fn merge_tool_use(totals: &mut BTreeMap<String, i64>, raw: &str) {
    let Ok(Value::Object(object)) = serde_json::from_str::<Value>(raw) else {
        return;
    };

    for (key, value) in object {
        let Some(count) = value
            .as_i64()
            .or_else(|| value.as_u64().map(|v| i64::try_from(v).unwrap_or(i64::MAX)))
        else {
            continue;
        };
        *totals
            .entry(normalize_tool_key(&key).to_string())
            .or_insert(0) += count;
    }
}

/// 合并后的工具调用 JSON；没有任何调用时为 `None`
#[must_use]
pub fn tool_use_json(totals: &BTreeMap<String, i64>) -> Option<String> {
    let used: serde_json::Map<String, Value> = totals
        .iter()
        .filter(|(_, count)| **count != 0)
        .map(|(key, count)| (key.clone(), Value::from(*count)))
        .collect();

    if used.is_empty() {
        None
    } else {
        Some(Value::Object(used).to_string())
    }
}

/// 某日 `[00:00, 次日 00:00)` 的时间范围
pub(crate) fn day_bounds(date: NaiveDate) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let next = date
        .checked_add_days(Days::new(1))
        .ok_or_else(|| AdminError::validation(format!("日期超出范围: {date}")))?;
    Ok((
        date.and_hms_opt(0, 0, 0).unwrap_or_default(),
        next.and_hms_opt(0, 0, 0).unwrap_or_default(),
    ))
}

/// 单个汇总组合的计数
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyUsage {
    pub user_id: i32,
    pub date: NaiveDate,
    pub api_provider: String,
    pub model: String,
    pub api_requests: i64,
    pub successful_requests: i64,
    pub failed_requests: i64,
    pub cancelled_requests: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub cache_read_input_tokens: i64,
    pub cache_creation_input_tokens: i64,
    pub reasoning_tokens: i64,
    pub audio_input_tokens: i64,
    pub audio_output_tokens: i64,
    pub server_tool_use: Option<String>,
}

/// 单日汇总结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregationStats {
    pub date: NaiveDate,
    pub combinations: usize,
    pub inserted: usize,
    pub updated: usize,
    pub errors: usize,
}

/// 无用户归属的用量分组
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromQueryResult)]
pub struct OrphanedGroup {
    pub date: String,
    pub api_provider: String,
    pub model: String,
    pub records: i64,
}

#[derive(Debug, FromQueryResult)]
struct GroupRow {
    user_id: i32,
    api_provider: String,
    model: String,
    api_requests: Option<i64>,
    successful_requests: Option<i64>,
    failed_requests: Option<i64>,
    cancelled_requests: Option<i64>,
    prompt_tokens: Option<i64>,
    completion_tokens: Option<i64>,
    cache_read_input_tokens: Option<i64>,
    cache_creation_input_tokens: Option<i64>,
    reasoning_tokens: Option<i64>,
    audio_input_tokens: Option<i64>,
    audio_output_tokens: Option<i64>,
}

#[derive(Debug, FromQueryResult)]
struct ToolUseRow {
    user_id: i32,
    api_provider: String,
    model: String,
    server_tool_use: Option<String>,
}

type GroupKey = (i32, String, String);

/// 用量汇总服务
pub struct UsageAggregationService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UsageAggregationService<'a> {
    #[must_use]
    pub const fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// 计算某日的汇总行（不写库）
    pub async fn daily_rows(&self, date: NaiveDate) -> Result<Vec<DailyUsage>> {
        let (start, end) = day_bounds(date)?;

        let groups = usage_records::Entity::find()
            .select_only()
            .column(usage_records::Column::UserId)
            .column_as(Expr::cust(PROVIDER_EXPR), "api_provider")
            .column(usage_records::Column::Model)
            .column_as(Expr::cust("COUNT(*)"), "api_requests")
            .column_as(
                Expr::cust("SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END)"),
                "successful_requests",
            )
            .column_as(
                Expr::cust("SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END)"),
                "failed_requests",
            )
            .column_as(
                Expr::cust("SUM(CASE WHEN status = 'cancelled' THEN 1 ELSE 0 END)"),
                "cancelled_requests",
            )
            .column_as(Expr::cust("SUM(COALESCE(prompt_tokens, 0))"), "prompt_tokens")
            .column_as(
                Expr::cust("SUM(COALESCE(completion_tokens, 0))"),
                "completion_tokens",
            )
            .column_as(
                Expr::cust("SUM(COALESCE(cache_read_input_tokens, 0))"),
                "cache_read_input_tokens",
            )
            .column_as(
                Expr::cust("SUM(COALESCE(cache_creation_input_tokens, 0))"),
                "cache_creation_input_tokens",
            )
            .column_as(Expr::cust("SUM(COALESCE(reasoning_tokens, 0))"), "reasoning_tokens")
            .column_as(
                Expr::cust("SUM(COALESCE(audio_input_tokens, 0))"),
                "audio_input_tokens",
            )
            .column_as(
                Expr::cust("SUM(COALESCE(audio_output_tokens, 0))"),
                "audio_output_tokens",
            )
            .filter(usage_records::Column::UserId.is_not_null())
            .filter(usage_records::Column::CreatedAt.gte(start))
            .filter(usage_records::Column::CreatedAt.lt(end))
            .group_by(usage_records::Column::UserId)
            .group_by(Expr::cust(PROVIDER_EXPR))
            .group_by(usage_records::Column::Model)
            .order_by(usage_records::Column::UserId, Order::Asc)
            .into_model::<GroupRow>()
            .all(self.db)
            .await
            .map_err(|err| db_error("汇总用量记录失败", &err))?;

        let tool_use = self.tool_use_by_group(start, end).await?;

        Ok(groups
            .into_iter()
            .map(|row| {
                let key = (row.user_id, row.api_provider.clone(), row.model.clone());
                let prompt_tokens = row.prompt_tokens.unwrap_or(0);
                let completion_tokens = row.completion_tokens.unwrap_or(0);
                DailyUsage {
                    user_id: row.user_id,
                    date,
                    api_provider: row.api_provider,
                    model: row.model,
                    api_requests: row.api_requests.unwrap_or(0),
                    successful_requests: row.successful_requests.unwrap_or(0),
                    failed_requests: row.failed_requests.unwrap_or(0),
                    cancelled_requests: row.cancelled_requests.unwrap_or(0),
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens + completion_tokens,
                    cache_read_input_tokens: row.cache_read_input_tokens.unwrap_or(0),
                    cache_creation_input_tokens: row.cache_creation_input_tokens.unwrap_or(0),
                    reasoning_tokens: row.reasoning_tokens.unwrap_or(0),
                    audio_input_tokens: row.audio_input_tokens.unwrap_or(0),
                    audio_output_tokens: row.audio_output_tokens.unwrap_or(0),
                    server_tool_use: tool_use.get(&key).and_then(tool_use_json),
                }
            })
            .collect())
    }

    async fn tool_use_by_group(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<HashMap<GroupKey, BTreeMap<String, i64>>> {
        let rows = usage_records::Entity::find()
            .select_only()
            .column(usage_records::Column::UserId)
            .column_as(Expr::cust(PROVIDER_EXPR), "api_provider")
            .column(usage_records::Column::Model)
            .column(usage_records::Column::ServerToolUse)
            .filter(usage_records::Column::UserId.is_not_null())
            .filter(usage_records::Column::ServerToolUse.is_not_null())
            .filter(usage_records::Column::CreatedAt.gte(start))
            .filter(usage_records::Column::CreatedAt.lt(end))
            .into_model::<ToolUseRow>()
            .all(self.db)
            .await
            .map_err(|err| db_error("查询工具调用记录失败", &err))?;

        let mut merged: HashMap<GroupKey, BTreeMap<String, i64>> = HashMap::new();
        for row in rows {
            let Some(raw) = row.server_tool_use else {
                continue;
            };
            merge_tool_use(
                merged
                    .entry((row.user_id, row.api_provider, row.model))
                    .or_default(),
                &raw,
            );
        }
        Ok(merged)
    }

    /// 汇总某日用量并写入日汇总表
    pub async fn aggregate_for_date(&self, date: NaiveDate) -> Result<AggregationStats> {
        let rows = self.daily_rows(date).await?;
        let mut stats = AggregationStats {
            date,
            combinations: rows.len(),
            inserted: 0,
            updated: 0,
            errors: 0,
        };

        for row in rows {
            let label = format!("{}/{}/{}", row.user_id, row.api_provider, row.model);
            match self.upsert(row).await {
                Ok(true) => stats.inserted += 1,
                Ok(false) => stats.updated += 1,
                Err(err) => {
                    stats.errors += 1;
                    lerror!(
                        "system",
                        LogStage::Aggregation,
                        LogComponent::Usage,
                        "upsert_failed",
                        &format!("写入日汇总失败 {date} {label}: {err}")
                    );
                }
            }
        }

        linfo!(
            "system",
            LogStage::Aggregation,
            LogComponent::Usage,
            "aggregate_day",
            &format!("{date} 用量汇总完成"),
            combinations = stats.combinations,
            inserted = stats.inserted,
            updated = stats.updated,
            errors = stats.errors
        );
        Ok(stats)
    }

    /// 汇总昨天的用量
    pub async fn aggregate_yesterday(&self) -> Result<AggregationStats> {
        let today = Utc::now().date_naive();
        let yesterday = today
            .pred_opt()
            .ok_or_else(|| AdminError::internal("无法计算昨天的日期"))?;
        self.aggregate_for_date(yesterday).await
    }

    /// 汇总闭区间 `[from, to]` 内的每一天
    pub async fn aggregate_for_date_range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AggregationStats>> {
        ensure_validation!(from <= to, "起始日期 {} 晚于结束日期 {}", from, to);

        let mut results = Vec::new();
        let mut current = from;
        while current <= to {
            results.push(self.aggregate_for_date(current).await?);
            match current.succ_opt() {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(results)
    }

    /// 回填以昨天为结尾的最近 `days` 天
    pub async fn backfill(&self, today: NaiveDate, days: u64) -> Result<Vec<AggregationStats>> {
        ensure_validation!(days > 0, "回填天数必须大于 0");

        let to = today
            .pred_opt()
            .ok_or_else(|| AdminError::validation(format!("日期超出范围: {today}")))?;
        let from = today
            .checked_sub_days(Days::new(days))
            .ok_or_else(|| AdminError::validation(format!("回填天数过大: {days}")))?;
        self.aggregate_for_date_range(from, to).await
    }

    /// 插入或更新一条日汇总，返回是否为新插入
    async fn upsert(&self, row: DailyUsage) -> Result<bool> {
        let now = Utc::now().naive_utc();
        let existing = usage_users_daily::Entity::find()
            .filter(usage_users_daily::Column::UserId.eq(row.user_id))
            .filter(usage_users_daily::Column::Date.eq(row.date))
            .filter(usage_users_daily::Column::ApiProvider.eq(row.api_provider.as_str()))
            .filter(usage_users_daily::Column::Model.eq(row.model.as_str()))
            .one(self.db)
            .await
            .map_err(|err| db_error("查询日汇总失败", &err))?;

        let inserted = existing.is_none();
        let mut active = match existing {
            Some(model) => model.into_active_model(),
            None => usage_users_daily::ActiveModel {
                user_id: Set(row.user_id),
                date: Set(row.date),
                api_provider: Set(row.api_provider.clone()),
                model: Set(row.model.clone()),
                input_price: Set(None),
                output_price: Set(None),
                cache_read_price: Set(None),
                cache_write_price: Set(None),
                currency: Set(None),
                created_at: Set(now),
                ..Default::default()
            },
        };

        active.api_requests = Set(row.api_requests);
        active.successful_requests = Set(row.successful_requests);
        active.failed_requests = Set(row.failed_requests);
        active.cancelled_requests = Set(row.cancelled_requests);
        active.prompt_tokens = Set(row.prompt_tokens);
        active.completion_tokens = Set(row.completion_tokens);
        active.total_tokens = Set(row.total_tokens);
        active.cache_read_input_tokens = Set(row.cache_read_input_tokens);
        active.cache_creation_input_tokens = Set(row.cache_creation_input_tokens);
        active.reasoning_tokens = Set(row.reasoning_tokens);
        active.audio_input_tokens = Set(row.audio_input_tokens);
        active.audio_output_tokens = Set(row.audio_output_tokens);
        active.server_tool_use = Set(row.server_tool_use);
        active.spend = Set(0.0);
        active.updated_at = Set(now);

        if inserted {
            active
                .insert(self.db)
                .await
                .map_err(|err| db_error("插入日汇总失败", &err))?;
        } else {
            active
                .update(self.db)
                .await
                .map_err(|err| db_error("更新日汇总失败", &err))?;
        }
        Ok(inserted)
    }

    /// 没有用户归属的用量记录分组
    pub async fn orphaned_summary(&self) -> Result<Vec<OrphanedGroup>> {
        usage_records::Entity::find()
            .select_only()
            .column_as(Expr::cust(DAY_EXPR), "date")
            .column_as(Expr::cust(PROVIDER_EXPR), "api_provider")
            .column(usage_records::Column::Model)
            .column_as(Expr::cust("COUNT(*)"), "records")
            .filter(usage_records::Column::UserId.is_null())
            .group_by(Expr::cust(DAY_EXPR))
            .group_by(Expr::cust(PROVIDER_EXPR))
            .group_by(usage_records::Column::Model)
            .order_by(Expr::cust(DAY_EXPR), Order::Asc)
            .into_model::<OrphanedGroup>()
            .all(self.db)
            .await
            .map_err(|err| db_error("查询孤立用量记录失败", &err))
    }

    /// 删除没有用户归属的用量记录
    pub async fn delete_orphaned(&self) -> Result<u64> {
        let result = usage_records::Entity::delete_many()
            .filter(usage_records::Column::UserId.is_null())
            .exec(self.db)
            .await
            .map_err(|err| db_error("删除孤立用量记录失败", &err))?;

        ldebug!(
            "system",
            LogStage::Aggregation,
            LogComponent::Usage,
            "delete_orphaned",
            &format!("删除孤立用量记录 {} 条", result.rows_affected)
        );
        Ok(result.rows_affected)
    }
}

fn db_error(message: &str, err: &DbErr) -> AdminError {
    lerror!(
        "system",
        LogStage::Db,
        LogComponent::Usage,
        "usage_db_error",
        &format!("{message}: {err}")
    );
    crate::error!(Database, format!("{message}: {err}"))
}
