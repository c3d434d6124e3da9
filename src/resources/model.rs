//! Domain catalog: the collection resources the back-office portals list.
//!
//! Wire values follow the product's API (`ativo`/`inativo` and friends).
//! Each type implements [`Resource`] so one controller and one mock backend
//! serve every screen.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FieldViolation;
use crate::gateway::Resource;
use crate::session::{Capability, Portal};

/// Sentinel the user screens send for "no school assigned". Parsed at the
/// boundary into an explicit meaning, distinct from an absent filter.
pub const UNASSIGNED_SCHOOL: &str = "__empty__";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid e-mail pattern"));

// 00.000.000/0000-00
static CNPJ_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}\.\d{3}\.\d{3}/\d{4}-\d{2}$").expect("valid CNPJ pattern"));

fn matches_uuid(candidate: Option<Uuid>, value: &str) -> bool {
    match value.parse::<Uuid>() {
        Ok(id) => candidate == Some(id),
        Err(_) => false,
    }
}

fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

// =============================================================================
// Shared status enums
// =============================================================================

/// Activation status shared by most registries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Ativo,
    Inativo,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Ativo => "ativo",
            RecordStatus::Inativo => "inativo",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ativo" => Some(RecordStatus::Ativo),
            "inativo" => Some(RecordStatus::Inativo),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Ativa,
    Inadimplente,
    Cancelada,
}

impl SubscriptionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Ativa => "ativa",
            SubscriptionStatus::Inadimplente => "inadimplente",
            SubscriptionStatus::Cancelada => "cancelada",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Aberto,
    EmAndamento,
    Resolvido,
    Fechado,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Aberto => "aberto",
            TicketStatus::EmAndamento => "em_andamento",
            TicketStatus::Resolvido => "resolvido",
            TicketStatus::Fechado => "fechado",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketPriority {
    Baixa,
    Media,
    Alta,
}

impl TicketPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPriority::Baixa => "baixa",
            TicketPriority::Media => "media",
            TicketPriority::Alta => "alta",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Email,
    Sms,
    Whatsapp,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Email => "email",
            TemplateKind::Sms => "sms",
            TemplateKind::Whatsapp => "whatsapp",
        }
    }
}

// =============================================================================
// Franchisors
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Franchisor {
    pub id: Uuid,
    pub name: String,
    pub cnpj: String,
    pub email: String,
    pub status: RecordStatus,
    pub school_count: u32,
    pub created_at: DateTime<Utc>,
}

impl Resource for Franchisor {
    const BASE_PATH: &'static str = "franchisors";
    const FILTER_KEYS: &'static [&'static str] = &["status"];
    const CAPABILITY: Capability = Capability::ManageFranchisors;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn matches_search(&self, needle: &str) -> bool {
        contains(&self.name, needle) || contains(&self.email, needle)
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "status" => self.status.as_str() == value,
            _ => false,
        }
    }

    fn sort_value(&self, field: &str) -> Option<String> {
        match field {
            "name" => Some(self.name.to_lowercase()),
            "created_at" => Some(self.created_at.to_rfc3339()),
            _ => None,
        }
    }

    fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "name must be non-empty"));
        }
        if !EMAIL_RE.is_match(&self.email) {
            violations.push(FieldViolation::new("email", "malformed e-mail address"));
        }
        if !CNPJ_RE.is_match(&self.cnpj) {
            violations.push(FieldViolation::new(
                "cnpj",
                "CNPJ must be formatted as 00.000.000/0000-00",
            ));
        }
        violations
    }
}

// =============================================================================
// Schools
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct School {
    pub id: Uuid,
    pub franchisor_id: Uuid,
    pub name: String,
    pub email: String,
    pub city: String,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl Resource for School {
    const BASE_PATH: &'static str = "schools";
    const FILTER_KEYS: &'static [&'static str] = &["status", "franchisor_id"];
    const CAPABILITY: Capability = Capability::ManageSchools;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn matches_search(&self, needle: &str) -> bool {
        contains(&self.name, needle) || contains(&self.city, needle)
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "status" => self.status.as_str() == value,
            "franchisor_id" => matches_uuid(Some(self.franchisor_id), value),
            _ => false,
        }
    }

    fn sort_value(&self, field: &str) -> Option<String> {
        match field {
            "name" => Some(self.name.to_lowercase()),
            "city" => Some(self.city.to_lowercase()),
            "created_at" => Some(self.created_at.to_rfc3339()),
            _ => None,
        }
    }

    fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "name must be non-empty"));
        }
        if !EMAIL_RE.is_match(&self.email) {
            violations.push(FieldViolation::new("email", "malformed e-mail address"));
        }
        violations
    }
}

// =============================================================================
// Portal users
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortalUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub portal: Portal,
    pub franchisor_id: Option<Uuid>,
    /// `None` means the account has no school assigned yet; the listing
    /// screen filters on that through [`UNASSIGNED_SCHOOL`].
    pub school_id: Option<Uuid>,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl Resource for PortalUser {
    const BASE_PATH: &'static str = "users";
    const FILTER_KEYS: &'static [&'static str] = &["portal", "status", "school_id"];
    const CAPABILITY: Capability = Capability::ManageUsers;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn matches_search(&self, needle: &str) -> bool {
        contains(&self.name, needle) || contains(&self.email, needle)
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "status" => self.status.as_str() == value,
            "portal" => self.portal.as_str() == value,
            "school_id" if value == UNASSIGNED_SCHOOL => self.school_id.is_none(),
            "school_id" => matches_uuid(self.school_id, value),
            _ => false,
        }
    }

    fn sort_value(&self, field: &str) -> Option<String> {
        match field {
            "name" => Some(self.name.to_lowercase()),
            "created_at" => Some(self.created_at.to_rfc3339()),
            _ => None,
        }
    }

    fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "name must be non-empty"));
        }
        if !EMAIL_RE.is_match(&self.email) {
            violations.push(FieldViolation::new("email", "malformed e-mail address"));
        }
        if self.portal == Portal::School && self.school_id.is_none() {
            violations.push(FieldViolation::new(
                "school_id",
                "school portal accounts need a school",
            ));
        }
        violations
    }
}

// =============================================================================
// Plans & subscriptions
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub price_cents: u64,
    pub max_students: u32,
    pub status: RecordStatus,
    pub created_at: DateTime<Utc>,
}

impl Resource for Plan {
    const BASE_PATH: &'static str = "plans";
    const FILTER_KEYS: &'static [&'static str] = &["status"];
    const CAPABILITY: Capability = Capability::ManagePlans;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn matches_search(&self, needle: &str) -> bool {
        contains(&self.name, needle)
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "status" => self.status.as_str() == value,
            _ => false,
        }
    }

    fn sort_value(&self, field: &str) -> Option<String> {
        match field {
            "name" => Some(self.name.to_lowercase()),
            // zero-padded so lexicographic order matches numeric order
            "price" => Some(format!("{:020}", self.price_cents)),
            _ => None,
        }
    }

    fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "name must be non-empty"));
        }
        if self.max_students == 0 {
            violations.push(FieldViolation::new(
                "max_students",
                "plan must allow at least one student",
            ));
        }
        violations
    }
}

/// Subscription rows carry denormalized school/plan names because the
/// listing searches across them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchoolSubscription {
    pub id: Uuid,
    pub school_id: Uuid,
    pub school_name: String,
    pub plan_id: Uuid,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub started_at: DateTime<Utc>,
    pub renews_at: Option<DateTime<Utc>>,
}

impl Resource for SchoolSubscription {
    const BASE_PATH: &'static str = "subscriptions";
    const FILTER_KEYS: &'static [&'static str] = &["status", "plan_id", "school_id"];
    const CAPABILITY: Capability = Capability::ManageSubscriptions;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn matches_search(&self, needle: &str) -> bool {
        contains(&self.school_name, needle) || contains(&self.plan_name, needle)
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "status" => self.status.as_str() == value,
            "plan_id" => matches_uuid(Some(self.plan_id), value),
            "school_id" => matches_uuid(Some(self.school_id), value),
            _ => false,
        }
    }

    fn sort_value(&self, field: &str) -> Option<String> {
        match field {
            "school" => Some(self.school_name.to_lowercase()),
            "started_at" => Some(self.started_at.to_rfc3339()),
            _ => None,
        }
    }
}

// =============================================================================
// Support tickets
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportTicket {
    pub id: Uuid,
    pub subject: String,
    pub requester_name: String,
    pub portal: Portal,
    pub status: TicketStatus,
    pub priority: TicketPriority,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Resource for SupportTicket {
    const BASE_PATH: &'static str = "support-tickets";
    const FILTER_KEYS: &'static [&'static str] = &["status", "priority", "portal"];
    const CAPABILITY: Capability = Capability::ManageTickets;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn matches_search(&self, needle: &str) -> bool {
        contains(&self.subject, needle) || contains(&self.requester_name, needle)
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "status" => self.status.as_str() == value,
            "priority" => self.priority.as_str() == value,
            "portal" => self.portal.as_str() == value,
            _ => false,
        }
    }

    fn sort_value(&self, field: &str) -> Option<String> {
        match field {
            "created_at" => Some(self.created_at.to_rfc3339()),
            "updated_at" => Some(self.updated_at.to_rfc3339()),
            _ => None,
        }
    }

    fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.subject.trim().is_empty() {
            violations.push(FieldViolation::new("subject", "subject must be non-empty"));
        }
        violations
    }
}

// =============================================================================
// Message templates
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageTemplate {
    pub id: Uuid,
    pub name: String,
    pub kind: TemplateKind,
    pub subject: Option<String>,
    pub body: String,
    pub status: RecordStatus,
    pub updated_at: DateTime<Utc>,
}

impl Resource for MessageTemplate {
    const BASE_PATH: &'static str = "templates";
    const FILTER_KEYS: &'static [&'static str] = &["kind", "status"];
    const CAPABILITY: Capability = Capability::ManageTemplates;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn matches_search(&self, needle: &str) -> bool {
        contains(&self.name, needle)
            || self
                .subject
                .as_deref()
                .is_some_and(|subject| contains(subject, needle))
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "kind" => self.kind.as_str() == value,
            "status" => self.status.as_str() == value,
            _ => false,
        }
    }

    fn sort_value(&self, field: &str) -> Option<String> {
        match field {
            "name" => Some(self.name.to_lowercase()),
            "updated_at" => Some(self.updated_at.to_rfc3339()),
            _ => None,
        }
    }

    fn validate(&self) -> Vec<FieldViolation> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push(FieldViolation::new("name", "name must be non-empty"));
        }
        if self.body.trim().is_empty() {
            violations.push(FieldViolation::new("body", "body must be non-empty"));
        }
        if self.kind == TemplateKind::Email
            && self.subject.as_deref().map_or(true, |s| s.trim().is_empty())
        {
            violations.push(FieldViolation::new(
                "subject",
                "e-mail templates need a subject",
            ));
        }
        violations
    }
}

// =============================================================================
// Audit log
// =============================================================================

/// Read-only trail; the portals never create or edit entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: Uuid,
    pub actor_name: String,
    pub actor_id: Uuid,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<Uuid>,
    pub portal: Portal,
    pub created_at: DateTime<Utc>,
    pub details: BTreeMap<String, String>,
}

impl Resource for AuditLogEntry {
    const BASE_PATH: &'static str = "audit-logs";
    const FILTER_KEYS: &'static [&'static str] = &["action", "entity", "portal"];
    const CAPABILITY: Capability = Capability::ViewAuditLog;

    fn id(&self) -> Uuid {
        self.id
    }

    fn assign_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn matches_search(&self, needle: &str) -> bool {
        contains(&self.actor_name, needle) || contains(&self.action, needle)
    }

    fn matches_filter(&self, key: &str, value: &str) -> bool {
        match key {
            "action" => self.action == value,
            "entity" => self.entity == value,
            "portal" => self.portal.as_str() == value,
            _ => false,
        }
    }

    fn sort_value(&self, field: &str) -> Option<String> {
        match field {
            "created_at" => Some(self.created_at.to_rfc3339()),
            _ => None,
        }
    }
}
