//! 库存与支出

use chrono::{NaiveDate, Utc};
use hms_core::models::*;
use hms_core::{access, HmsError, RequestContext, Result};
use hms_database::statements;
use hms_database::{DatabasePool, DatabaseQueries};
use serde::Serialize;
use std::collections::BTreeMap;

/// 新库存物品
#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub name: String,
    pub category: String,
    pub quantity: i64,
    pub unit: String,
    pub reorder_level: i64,
}

/// 库存数量调整
#[derive(Debug, Clone, Copy)]
pub struct StockUpdate {
    pub item_id: i64,
    pub quantity: i64,
    pub reorder_level: i64,
}

/// 新支出
#[derive(Debug, Clone)]
pub struct NewExpense {
    pub category: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
    pub recorded_by: i64,
}

/// 管理页面的操作
#[derive(Debug, Clone)]
pub enum AdminCommand {
    AddItem(NewInventoryItem),
    UpdateStock(StockUpdate),
    RemoveItem { item_id: i64 },
    AddExpense(NewExpense),
    RemoveExpense { expense_id: i64 },
}

/// 管理页面数据
#[derive(Debug, Clone, Serialize)]
pub struct AdminPage {
    pub inventory: Vec<InventoryItem>,
    pub low_stock: Vec<InventoryItem>,
    pub expenses: Vec<ExpenseListing>,
    pub expense_totals: BTreeMap<String, f64>,
    pub staff: Vec<StaffListing>,
}

/// 数量不高于补货线的物品
pub fn low_stock_items(items: &[InventoryItem]) -> Vec<InventoryItem> {
    items.iter().filter(|i| i.is_low_stock()).cloned().collect()
}

/// 按类别汇总支出，类别按字母序
pub fn expense_totals_by_category<'e, I>(expenses: I) -> BTreeMap<String, f64>
where
    I: IntoIterator<Item = &'e Expense>,
{
    let mut totals = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
    }
    totals
}

pub struct InventoryLedger<'a> {
    db: &'a DatabasePool,
}

impl<'a> InventoryLedger<'a> {
    pub fn new(db: &'a DatabasePool) -> Self {
        Self { db }
    }

    pub async fn execute(&self, ctx: &RequestContext, command: AdminCommand) -> Result<String> {
        let notice = match command {
            AdminCommand::AddItem(item) => {
                self.add_item(ctx, item).await?;
                "Inventory item added successfully"
            }
            AdminCommand::UpdateStock(update) => {
                self.update_stock(ctx, update).await?;
                "Inventory updated successfully"
            }
            AdminCommand::RemoveItem { item_id } => {
                self.remove_item(ctx, item_id).await?;
                "Inventory item removed successfully"
            }
            AdminCommand::AddExpense(expense) => {
                self.add_expense(ctx, expense).await?;
                "Expense recorded successfully"
            }
            AdminCommand::RemoveExpense { expense_id } => {
                self.remove_expense(ctx, expense_id).await?;
                "Expense removed successfully"
            }
        };
        Ok(notice.to_string())
    }

    pub async fn add_item(&self, ctx: &RequestContext, item: NewInventoryItem) -> Result<i64> {
        ctx.require_role(access::ADMINISTRATION)?;
        for (field, value) in [
            ("Item name", &item.name),
            ("Category", &item.category),
            ("Unit", &item.unit),
        ] {
            if value.trim().is_empty() {
                return Err(HmsError::Validation(format!("{} is required", field)));
            }
        }
        check_stock_levels(item.quantity, item.reorder_level)?;

        let mut conn = self.db.acquire().await?;
        let item_id = statements::insert_inventory_item(
            &mut conn,
            item.name.trim(),
            item.category.trim(),
            item.quantity,
            item.unit.trim(),
            item.reorder_level,
            Utc::now(),
        )
        .await?;

        tracing::info!("Inventory item {} ({}) added", item.name.trim(), item_id);
        Ok(item_id)
    }

    pub async fn update_stock(&self, ctx: &RequestContext, update: StockUpdate) -> Result<()> {
        ctx.require_role(access::ADMINISTRATION)?;
        check_stock_levels(update.quantity, update.reorder_level)?;

        let mut conn = self.db.acquire().await?;
        let updated = statements::update_inventory_stock(
            &mut conn,
            update.item_id,
            update.quantity,
            update.reorder_level,
            Utc::now(),
        )
        .await?;
        if !updated {
            return Err(HmsError::NotFound("Inventory item not found".to_string()));
        }

        tracing::info!(
            "Inventory item {} set to {} (reorder at {})",
            update.item_id,
            update.quantity,
            update.reorder_level
        );
        Ok(())
    }

    pub async fn remove_item(&self, ctx: &RequestContext, item_id: i64) -> Result<()> {
        ctx.require_role(access::ADMINISTRATION)?;
        let mut conn = self.db.acquire().await?;
        if !statements::delete_inventory_item(&mut conn, item_id).await? {
            return Err(HmsError::NotFound("Inventory item not found".to_string()));
        }
        tracing::info!("Inventory item {} removed", item_id);
        Ok(())
    }

    pub async fn add_expense(&self, ctx: &RequestContext, expense: NewExpense) -> Result<i64> {
        ctx.require_role(access::ADMINISTRATION)?;
        if expense.category.trim().is_empty() {
            return Err(HmsError::validation("Category is required"));
        }
        if expense.description.trim().is_empty() {
            return Err(HmsError::validation("Description is required"));
        }
        if !expense.amount.is_finite() || expense.amount < 0.0 {
            return Err(HmsError::validation("Amount must be a non-negative amount"));
        }

        let mut conn = self.db.acquire().await?;
        if !statements::staff_exists(&mut conn, expense.recorded_by).await? {
            return Err(HmsError::NotFound("Recording staff member not found".to_string()));
        }
        let expense_id = statements::insert_expense(
            &mut conn,
            expense.category.trim(),
            expense.amount,
            expense.description.trim(),
            expense.date,
            expense.recorded_by,
        )
        .await?;

        tracing::info!(
            "Expense {} recorded: {} {:.2}",
            expense_id,
            expense.category.trim(),
            expense.amount
        );
        Ok(expense_id)
    }

    pub async fn remove_expense(&self, ctx: &RequestContext, expense_id: i64) -> Result<()> {
        ctx.require_role(access::ADMINISTRATION)?;
        let mut conn = self.db.acquire().await?;
        if !statements::delete_expense(&mut conn, expense_id).await? {
            return Err(HmsError::NotFound("Expense not found".to_string()));
        }
        tracing::info!("Expense {} removed", expense_id);
        Ok(())
    }

    pub async fn page(&self, ctx: &RequestContext) -> Result<AdminPage> {
        ctx.require_role(access::ADMINISTRATION)?;
        let queries = DatabaseQueries::new(self.db);

        let inventory = queries.list_inventory().await?;
        let expenses = queries.list_expenses().await?;

        Ok(AdminPage {
            low_stock: low_stock_items(&inventory),
            expense_totals: expense_totals_by_category(expenses.iter().map(|e| &e.expense)),
            inventory,
            expenses,
            staff: queries.list_staff().await?,
        })
    }
}

fn check_stock_levels(quantity: i64, reorder_level: i64) -> Result<()> {
    if quantity < 0 {
        return Err(HmsError::validation("Quantity cannot be negative"));
    }
    if reorder_level < 0 {
        return Err(HmsError::validation("Reorder level cannot be negative"));
    }
    Ok(())
}
