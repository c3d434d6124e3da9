pub mod model;

pub use model::{
    AuditLogEntry, Franchisor, MessageTemplate, Plan, PortalUser, RecordStatus, School,
    SubscriptionStatus, SchoolSubscription, SupportTicket, TemplateKind, TicketPriority,
    TicketStatus, UNASSIGNED_SCHOOL,
};
