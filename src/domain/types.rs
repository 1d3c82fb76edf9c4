// ==========================================
// 工程项目挣值管理系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ==========================================
// 项目状态 (Project State)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProjectState {
    Planned,    // 计划中
    InProgress, // 执行中
    Completed,  // 已完成
    Cancelled,  // 已取消
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectState::Planned => write!(f, "PLANNED"),
            ProjectState::InProgress => write!(f, "IN_PROGRESS"),
            ProjectState::Completed => write!(f, "COMPLETED"),
            ProjectState::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for ProjectState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PLANNED" => Ok(ProjectState::Planned),
            "IN_PROGRESS" => Ok(ProjectState::InProgress),
            "COMPLETED" => Ok(ProjectState::Completed),
            "CANCELLED" => Ok(ProjectState::Cancelled),
            other => Err(format!("未知项目状态: {}", other)),
        }
    }
}

// ==========================================
// 活动状态 (Activity State)
// ==========================================
// 由完成百分比派生，不单独存储
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityState {
    Pending,    // 未开始
    InProgress, // 进行中
    Completed,  // 已完成
}

impl fmt::Display for ActivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActivityState::Pending => write!(f, "PENDING"),
            ActivityState::InProgress => write!(f, "IN_PROGRESS"),
            ActivityState::Completed => write!(f, "COMPLETED"),
        }
    }
}

// ==========================================
// 审批状态 (Approval Status) - 预算变更
// ==========================================
// 只有 Approved 的变更计入 BAC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApprovalStatus {
    Pending,  // 待审批
    Approved, // 已批准
    Rejected, // 已驳回
    InReview, // 审核中
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalStatus::Pending => write!(f, "PENDING"),
            ApprovalStatus::Approved => write!(f, "APPROVED"),
            ApprovalStatus::Rejected => write!(f, "REJECTED"),
            ApprovalStatus::InReview => write!(f, "IN_REVIEW"),
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(ApprovalStatus::Pending),
            "APPROVED" => Ok(ApprovalStatus::Approved),
            "REJECTED" => Ok(ApprovalStatus::Rejected),
            "IN_REVIEW" => Ok(ApprovalStatus::InReview),
            other => Err(format!("未知审批状态: {}", other)),
        }
    }
}

// ==========================================
// 客户发票状态 (Client Invoice Status)
// ==========================================
// 生命周期: DRAFT → ISSUED → PAYMENT_REPORTED → PAYMENT_VERIFIED → PAID
// 银行未到账: PAYMENT_REPORTED → PAYMENT_NOT_RECEIVED，可再次报付款
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientInvoiceStatus {
    Draft,              // 草稿
    Issued,             // 已开具
    PaymentReported,    // 客户已报付款
    PaymentVerified,    // 银行已核实
    Paid,               // 已结清
    PaymentNotReceived, // 银行未到账（问题发票）
}

impl ClientInvoiceStatus {
    /// 是否计入已核实回款序列
    pub fn is_verified(&self) -> bool {
        matches!(
            self,
            ClientInvoiceStatus::PaymentVerified | ClientInvoiceStatus::Paid
        )
    }
}

impl fmt::Display for ClientInvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientInvoiceStatus::Draft => write!(f, "DRAFT"),
            ClientInvoiceStatus::Issued => write!(f, "ISSUED"),
            ClientInvoiceStatus::PaymentReported => write!(f, "PAYMENT_REPORTED"),
            ClientInvoiceStatus::PaymentVerified => write!(f, "PAYMENT_VERIFIED"),
            ClientInvoiceStatus::Paid => write!(f, "PAID"),
            ClientInvoiceStatus::PaymentNotReceived => write!(f, "PAYMENT_NOT_RECEIVED"),
        }
    }
}

impl FromStr for ClientInvoiceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "DRAFT" => Ok(ClientInvoiceStatus::Draft),
            "ISSUED" => Ok(ClientInvoiceStatus::Issued),
            "PAYMENT_REPORTED" => Ok(ClientInvoiceStatus::PaymentReported),
            "PAYMENT_VERIFIED" => Ok(ClientInvoiceStatus::PaymentVerified),
            "PAID" => Ok(ClientInvoiceStatus::Paid),
            "PAYMENT_NOT_RECEIVED" => Ok(ClientInvoiceStatus::PaymentNotReceived),
            other => Err(format!("未知发票状态: {}", other)),
        }
    }
}

// ==========================================
// 风险等级 (Risk Level)
// ==========================================
// 顺序: Green < Yellow < Orange < Red
// 对应: 低风险 / 中风险 / 高风险 / 严重风险
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Green,  // 低
    Yellow, // 中
    Orange, // 高
    Red,    // 严重
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Green => write!(f, "GREEN"),
            RiskLevel::Yellow => write!(f, "YELLOW"),
            RiskLevel::Orange => write!(f, "ORANGE"),
            RiskLevel::Red => write!(f, "RED"),
        }
    }
}

// ==========================================
// 效率等级 (Efficiency Level) - CPI/SPI 分档
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EfficiencyLevel {
    Critical,      // < 0.80
    AtRisk,        // [0.80, 0.90)
    Acceptable,    // [0.90, 1.00)
    Efficient,     // [1.00, 1.10)
    VeryEfficient, // >= 1.10
}

impl fmt::Display for EfficiencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EfficiencyLevel::Critical => write!(f, "CRITICAL"),
            EfficiencyLevel::AtRisk => write!(f, "AT_RISK"),
            EfficiencyLevel::Acceptable => write!(f, "ACCEPTABLE"),
            EfficiencyLevel::Efficient => write!(f, "EFFICIENT"),
            EfficiencyLevel::VeryEfficient => write!(f, "VERY_EFFICIENT"),
        }
    }
}

// ==========================================
// 趋势 (Trend)
// ==========================================
// 成本: Improving / Stable / Worsening
// 进度: Ahead / OnTime / Behind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CostTrend {
    Improving,
    Stable,
    Worsening,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScheduleTrend {
    Ahead,
    OnTime,
    Behind,
}

// ==========================================
// 数据质量 (Data Quality) - 活动填报覆盖率
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataQuality {
    NoData,
    Poor,
    Fair,
    Good,
    Excellent,
}

// ==========================================
// 权重可靠性 (Weight Reliability)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WeightReliability {
    Low,        // 无权重数据
    Variable,   // 极差 > 50
    Acceptable, // 极差 (25, 50]
    Good,       // 极差 <= 25
}

// ==========================================
// 物理进度数据来源 (Progress Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressSource {
    Activities,      // 活动加权
    ProjectProgress, // 回退: 进度日志 / 项目字段
}

impl fmt::Display for ProgressSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgressSource::Activities => write!(f, "activities"),
            ProgressSource::ProjectProgress => write!(f, "project_progress"),
        }
    }
}

// ==========================================
// 实际成本来源 (AC Source)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostSource {
    SupplierInvoices, // 供应商发票
    PurchaseOrders,   // 采购订单明细
    None,             // 无成本数据
}

impl fmt::Display for CostSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CostSource::SupplierInvoices => write!(f, "supplier_invoices"),
            CostSource::PurchaseOrders => write!(f, "purchase_orders"),
            CostSource::None => write!(f, "none"),
        }
    }
}
