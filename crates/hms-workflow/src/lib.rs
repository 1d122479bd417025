//! # HMS业务流程模块
//!
//! 各页面背后的业务组件，每个组件以带标签的命令枚举对外提供操作：
//! - 患者生命周期：登记、入院、出院、删除
//! - 员工与科室：科室维护、员工入职（同时创建账号）、在职状态变更
//! - 病房管理：新增病房、状态调整
//! - 库存与支出：库存维护、低库存提示、支出分类汇总
//! - 身份与访问：登录、登出、注册、修改密码
//! - 仪表盘：统计与最近访问记录

pub mod dashboard;
pub mod identity;
pub mod inventory;
pub mod patients;
pub mod rooms;
pub mod staff;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出主要类型
pub use dashboard::{Dashboard, DashboardPage};
pub use identity::{AccountCommand, IdentityService, PasswordChange, Registration};
pub use inventory::{
    expense_totals_by_category, low_stock_items, AdminCommand, AdminPage, InventoryLedger,
    NewExpense, NewInventoryItem, StockUpdate,
};
pub use patients::{
    AdmitPatient, DischargeOutcome, DischargePatient, NewPatient, PatientCommand,
    PatientLifecycle, PatientOutcome, PatientRow, PatientsPage,
};
pub use rooms::{NewRoom, RoomCommand, RoomManager, RoomsPage};
pub use staff::{NewDepartment, NewStaff, OnboardedStaff, StaffCommand, StaffDirectory, StaffPage};
