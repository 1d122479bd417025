//! 表单解析
//!
//! 每个页面的 POST 表单带一个 `action` 字段，按它反序列化为对应的变体，
//! 再把文本字段转换为业务命令。字段格式错误在这里返回 Validation 错误。

use hms_core::utils::{
    optional, parse_amount, parse_choice, parse_date, parse_id, parse_int_at_least, required,
};
use hms_core::{HmsError, Result, Role};
use hms_workflow::{
    AccountCommand, AdminCommand, AdmitPatient, DischargePatient, NewDepartment, NewExpense,
    NewInventoryItem, NewPatient, NewRoom, NewStaff, PasswordChange, PatientCommand, Registration,
    RoomCommand, StaffCommand, StockUpdate,
};
use serde::Deserialize;

/// 库存物品类别
pub const INVENTORY_CATEGORIES: &[&str] = &["Medicine", "Equipment", "Supplies", "Laboratory"];

/// 支出类别
pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Utilities",
    "Supplies",
    "Maintenance",
    "Salaries",
    "Equipment",
    "Other",
];

fn one_of(field: &str, value: &str, allowed: &[&str]) -> Result<String> {
    let value = required(field, value)?;
    if allowed.contains(&value.as_str()) {
        Ok(value)
    } else {
        Err(HmsError::Validation(format!("Invalid {}: {}", field, value)))
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub role: String,
}

impl RegisterForm {
    pub fn into_registration(self) -> Result<Registration> {
        let role: Role = parse_choice("Role", &self.role)?;
        if self.password.is_empty() {
            return Err(HmsError::validation("Password is required"));
        }
        Ok(Registration {
            username: required("Username", &self.username)?,
            password: self.password,
            first_name: required("First name", &self.first_name)?,
            last_name: required("Last name", &self.last_name)?,
            email: required("Email", &self.email)?,
            role,
        })
    }
}

/// 患者页面表单
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PatientForm {
    Add {
        first_name: String,
        last_name: String,
        date_of_birth: String,
        gender: String,
        blood_group: String,
        phone: String,
        #[serde(default)]
        email: Option<String>,
        emergency_contact: String,
        address: String,
    },
    Admit {
        patient_id: String,
        room_id: String,
        doctor_id: String,
        diagnosis: String,
    },
    Discharge {
        admission_id: String,
        room_id: String,
        #[serde(default)]
        discharge_notes: Option<String>,
    },
    Remove {
        patient_id: String,
    },
}

impl PatientForm {
    pub fn into_command(self) -> Result<PatientCommand> {
        let command = match self {
            PatientForm::Add {
                first_name,
                last_name,
                date_of_birth,
                gender,
                blood_group,
                phone,
                email,
                emergency_contact,
                address,
            } => PatientCommand::Add(NewPatient {
                first_name: required("First name", &first_name)?,
                last_name: required("Last name", &last_name)?,
                date_of_birth: parse_date("Date of birth", &date_of_birth)?,
                gender: parse_choice("Gender", &gender)?,
                address: required("Address", &address)?,
                phone: required("Phone", &phone)?,
                email: optional(email.as_deref()),
                emergency_contact: required("Emergency contact", &emergency_contact)?,
                blood_group: parse_choice("Blood group", &blood_group)?,
            }),
            PatientForm::Admit {
                patient_id,
                room_id,
                doctor_id,
                diagnosis,
            } => PatientCommand::Admit(AdmitPatient {
                patient_id: parse_id("Patient", &patient_id)?,
                room_id: parse_id("Room", &room_id)?,
                doctor_id: parse_id("Doctor", &doctor_id)?,
                diagnosis: required("Diagnosis", &diagnosis)?,
            }),
            PatientForm::Discharge {
                admission_id,
                room_id,
                discharge_notes,
            } => PatientCommand::Discharge(DischargePatient {
                admission_id: parse_id("Admission", &admission_id)?,
                room_id: parse_id("Room", &room_id)?,
                notes: optional(discharge_notes.as_deref()),
            }),
            PatientForm::Remove { patient_id } => PatientCommand::Remove {
                patient_id: parse_id("Patient", &patient_id)?,
            },
        };
        Ok(command)
    }
}

/// 病房页面表单
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RoomForm {
    Add {
        room_number: String,
        room_type: String,
        capacity: String,
        floor_number: String,
    },
    Update {
        room_id: String,
        status: String,
    },
}

impl RoomForm {
    pub fn into_command(self) -> Result<RoomCommand> {
        let command = match self {
            RoomForm::Add {
                room_number,
                room_type,
                capacity,
                floor_number,
            } => RoomCommand::Add(NewRoom {
                room_number: required("Room number", &room_number)?,
                room_type: parse_choice("Room type", &room_type)?,
                capacity: parse_int_at_least("Capacity", &capacity, 1)?,
                floor_number: parse_int_at_least("Floor number", &floor_number, 1)?,
            }),
            RoomForm::Update { room_id, status } => RoomCommand::SetStatus {
                room_id: parse_id("Room", &room_id)?,
                status: parse_choice("Status", &status)?,
            },
        };
        Ok(command)
    }
}

/// 员工页面表单
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum StaffForm {
    AddDepartment {
        department_name: String,
        #[serde(default)]
        description: Option<String>,
    },
    AddStaff {
        first_name: String,
        last_name: String,
        department_id: String,
        role: String,
        email: String,
        phone: String,
        hire_date: String,
    },
    UpdateStaffStatus {
        staff_id: String,
        status: String,
    },
}

impl StaffForm {
    pub fn into_command(self) -> Result<StaffCommand> {
        let command = match self {
            StaffForm::AddDepartment {
                department_name,
                description,
            } => StaffCommand::AddDepartment(NewDepartment {
                name: required("Department name", &department_name)?,
                description: optional(description.as_deref()),
            }),
            StaffForm::AddStaff {
                first_name,
                last_name,
                department_id,
                role,
                email,
                phone,
                hire_date,
            } => StaffCommand::Onboard(NewStaff {
                first_name: required("First name", &first_name)?,
                last_name: required("Last name", &last_name)?,
                department_id: parse_id("Department", &department_id)?,
                role: parse_choice("Role", &role)?,
                email: required("Email", &email)?,
                phone: required("Phone", &phone)?,
                hire_date: parse_date("Hire date", &hire_date)?,
            }),
            StaffForm::UpdateStaffStatus { staff_id, status } => StaffCommand::UpdateStatus {
                staff_id: parse_id("Staff", &staff_id)?,
                status: parse_choice("Status", &status)?,
            },
        };
        Ok(command)
    }
}

/// 管理页面表单
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AdminForm {
    AddInventory {
        item_name: String,
        category: String,
        quantity: String,
        unit: String,
        reorder_level: String,
    },
    UpdateInventory {
        item_id: String,
        quantity: String,
        reorder_level: String,
    },
    RemoveInventory {
        item_id: String,
    },
    AddExpense {
        expense_category: String,
        amount: String,
        date: String,
        description: String,
        recorded_by: String,
    },
    RemoveExpense {
        expense_id: String,
    },
}

impl AdminForm {
    pub fn into_command(self) -> Result<AdminCommand> {
        let command = match self {
            AdminForm::AddInventory {
                item_name,
                category,
                quantity,
                unit,
                reorder_level,
            } => AdminCommand::AddItem(NewInventoryItem {
                name: required("Item name", &item_name)?,
                category: one_of("Category", &category, INVENTORY_CATEGORIES)?,
                quantity: parse_int_at_least("Quantity", &quantity, 0)?,
                unit: required("Unit", &unit)?,
                reorder_level: parse_int_at_least("Reorder level", &reorder_level, 0)?,
            }),
            AdminForm::UpdateInventory {
                item_id,
                quantity,
                reorder_level,
            } => AdminCommand::UpdateStock(StockUpdate {
                item_id: parse_id("Item", &item_id)?,
                quantity: parse_int_at_least("Quantity", &quantity, 0)?,
                reorder_level: parse_int_at_least("Reorder level", &reorder_level, 0)?,
            }),
            AdminForm::RemoveInventory { item_id } => AdminCommand::RemoveItem {
                item_id: parse_id("Item", &item_id)?,
            },
            AdminForm::AddExpense {
                expense_category,
                amount,
                date,
                description,
                recorded_by,
            } => AdminCommand::AddExpense(NewExpense {
                category: one_of("Category", &expense_category, EXPENSE_CATEGORIES)?,
                amount: parse_amount("Amount", &amount)?,
                description: required("Description", &description)?,
                date: parse_date("Date", &date)?,
                recorded_by: parse_id("Recorded by", &recorded_by)?,
            }),
            AdminForm::RemoveExpense { expense_id } => AdminCommand::RemoveExpense {
                expense_id: parse_id("Expense", &expense_id)?,
            },
        };
        Ok(command)
    }
}

/// 仪表盘上的账号表单
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AccountForm {
    ChangePassword {
        current_password: String,
        new_password: String,
        confirm_password: String,
    },
}

impl AccountForm {
    pub fn into_command(self) -> AccountCommand {
        match self {
            AccountForm::ChangePassword {
                current_password,
                new_password,
                confirm_password,
            } => AccountCommand::ChangePassword(PasswordChange {
                current_password,
                new_password,
                confirm_password,
            }),
        }
    }
}
