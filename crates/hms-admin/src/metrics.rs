//! Prometheus 指标

use anyhow::Result;
use prometheus::{Encoder, IntCounter, Opts, Registry, TextEncoder};

/// 业务指标
#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    logins_succeeded: IntCounter,
    logins_failed: IntCounter,
    admissions_total: IntCounter,
    discharges_total: IntCounter,
    transaction_failures_total: IntCounter,
}

impl Metrics {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("hms".to_string()), None)?;

        let logins_succeeded = IntCounter::with_opts(Opts::new(
            "logins_succeeded_total",
            "Number of successful logins",
        ))?;
        let logins_failed = IntCounter::with_opts(Opts::new(
            "logins_failed_total",
            "Number of rejected login attempts",
        ))?;
        let admissions_total = IntCounter::with_opts(Opts::new(
            "admissions_total",
            "Number of patient admissions",
        ))?;
        let discharges_total = IntCounter::with_opts(Opts::new(
            "discharges_total",
            "Number of patient discharges",
        ))?;
        let transaction_failures_total = IntCounter::with_opts(Opts::new(
            "transaction_failures_total",
            "Number of multi-statement operations rolled back after a failure",
        ))?;

        // 注册所有指标
        registry.register(Box::new(logins_succeeded.clone()))?;
        registry.register(Box::new(logins_failed.clone()))?;
        registry.register(Box::new(admissions_total.clone()))?;
        registry.register(Box::new(discharges_total.clone()))?;
        registry.register(Box::new(transaction_failures_total.clone()))?;

        Ok(Self {
            registry,
            logins_succeeded,
            logins_failed,
            admissions_total,
            discharges_total,
            transaction_failures_total,
        })
    }

    pub fn record_login(&self, succeeded: bool) {
        if succeeded {
            self.logins_succeeded.inc();
        } else {
            self.logins_failed.inc();
        }
    }

    pub fn record_admission(&self) {
        self.admissions_total.inc();
    }

    pub fn record_discharge(&self) {
        self.discharges_total.inc();
    }

    pub fn record_transaction_failure(&self) {
        self.transaction_failures_total.inc();
    }

    /// 文本格式导出
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
