use crate::error::AppError;
use crate::expense_client::ExpenseSource;
use crate::schemas::{CategoryTotals, Expense, Summary, UserId};

pub fn summarize(expenses: Vec<Expense>) -> Summary {
    let mut total_amount = 0.0;
    let mut category_totals = CategoryTotals::new();
    for expense in &expenses {
        let amount = expense.amount;
        total_amount += amount;
        category_totals
            .entry(expense.category.clone())
            .and_modify(|v| *v += amount)
            .or_insert(amount);
    }
    Summary {
        total_amount,
        category_totals,
        expenses,
    }
}

/// Fetches the user's expenses and reduces them. Fetch errors are returned
/// as-is, never folded into an empty summary.
pub async fn fetch_summary<S>(source: &S, user_id: UserId) -> Result<Summary, AppError>
where
    S: ExpenseSource + Send + Sync + ?Sized,
{
    let expenses = source.list_expenses(user_id).await?;
    Ok(summarize(expenses))
}
