use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type UserId = i64;

pub type CategoryTotals = HashMap<String, f64>;

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct Expense {
    pub id: i64,
    #[serde(alias = "userId")]
    pub user_id: UserId,
    pub category: String,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_amount: f64,
    pub category_totals: CategoryTotals,
    pub expenses: Vec<Expense>,
}
