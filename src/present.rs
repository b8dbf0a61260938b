// src/present.rs

use crate::model::InvoiceRecord;
use crate::stats::{StatsCounters, format_time_saved};
use std::collections::VecDeque;
use std::fmt::Write;
use std::time::{Duration, Instant};
use time::Date;
use time::macros::format_description;

pub const EMPTY_PLACEHOLDER: &str = "No invoices yet. Upload your first invoice!";
pub const SAVED_TOAST: &str = "Invoice processed successfully!";

/// `Jan 1, 2024`.
pub fn format_date(date: Date) -> String {
    date.format(format_description!(
        "[month repr:short] [day padding:none], [year]"
    ))
    .unwrap_or_else(|_| date.to_string())
}

pub fn format_currency(amount: f64) -> String {
    format!("${amount:.2}")
}

/// The recent-invoice list: newest first, at most `limit` lines. Nothing to
/// show (no records, or a zero limit) renders the placeholder.
pub fn render_recent(records: &[InvoiceRecord], limit: usize) -> String {
    if records.is_empty() || limit == 0 {
        return EMPTY_PLACEHOLDER.to_string();
    }

    let mut out = String::new();
    for record in records.iter().take(limit) {
        let _ = writeln!(
            out,
            "{:<24} {} • {:<14} {:>12}",
            record.vendor,
            record.invoice_number,
            format_date(record.date),
            format_currency(record.amount)
        );
    }
    out
}

pub fn render_stats(counters: &StatsCounters) -> String {
    format!(
        "Total: {}   Today: {}   Time saved: {}",
        counters.total_processed,
        counters.processed_today,
        format_time_saved(counters.cumulative_minutes_saved)
    )
}

#[derive(Debug)]
struct Toast {
    message: String,
    expires_at: Instant,
}

/// Transient notifications that expire after a fixed time-to-live.
#[derive(Debug)]
pub struct ToastQueue {
    ttl: Duration,
    toasts: VecDeque<Toast>,
}

impl ToastQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            toasts: VecDeque::new(),
        }
    }

    pub fn push(&mut self, message: impl Into<String>, now: Instant) {
        self.toasts.push_back(Toast {
            message: message.into(),
            expires_at: now + self.ttl,
        });
    }

    /// Messages still showing at `now`; expired ones are dropped.
    pub fn active(&mut self, now: Instant) -> Vec<&str> {
        self.toasts.retain(|t| t.expires_at > now);
        self.toasts.iter().map(|t| t.message.as_str()).collect()
    }
}
