//! Method-token dispatch: from `entity.action` to a `RequestPlan`.
//!
//! # Design
//! Each entity group owns a static rule table mapping an `Action` to the
//! verb and URL shape it uses. Resolution is a table lookup followed by
//! path rendering, so it is pure and can be tested without any I/O. An
//! action that parses but is missing from its group's table is rejected
//! here and never reaches the wire.

use std::fmt;

use serde_json::json;

use crate::args::Arguments;
use crate::error::ApiError;
use crate::http::HttpMethod;

/// Resource family addressed by a method token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Entity {
    Invoices,
    InvoiceReceipts,
    SimplifiedInvoices,
    CreditNotes,
    DebitNotes,
    Clients,
    Items,
}

impl Entity {
    pub const ALL: [Entity; 7] = [
        Entity::Invoices,
        Entity::InvoiceReceipts,
        Entity::SimplifiedInvoices,
        Entity::CreditNotes,
        Entity::DebitNotes,
        Entity::Clients,
        Entity::Items,
    ];

    pub fn parse(s: &str) -> Option<Entity> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Invoices => "invoices",
            Entity::InvoiceReceipts => "invoice_receipts",
            Entity::SimplifiedInvoices => "simplified_invoices",
            Entity::CreditNotes => "credit_notes",
            Entity::DebitNotes => "debit_notes",
            Entity::Clients => "clients",
            Entity::Items => "items",
        }
    }

    /// Document entities that share the invoice rule table.
    pub fn is_invoice_like(self) -> bool {
        !matches!(self, Entity::Clients | Entity::Items)
    }

    fn rules(self) -> &'static [(Action, Rule)] {
        match self {
            Entity::Clients => CLIENT_RULES,
            Entity::Items => ITEM_RULES,
            _ => INVOICE_RULES,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operation requested on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    List,
    Get,
    Update,
    Delete,
    ChangeState,
    EmailDocument,
    RelatedDocuments,
    Invoices,
    FindByName,
    FindByCode,
    CreateInvoice,
    CreateCashInvoice,
    CreateCreditNote,
    CreateDebitNote,
}

impl Action {
    pub const ALL: [Action; 15] = [
        Action::Create,
        Action::List,
        Action::Get,
        Action::Update,
        Action::Delete,
        Action::ChangeState,
        Action::EmailDocument,
        Action::RelatedDocuments,
        Action::Invoices,
        Action::FindByName,
        Action::FindByCode,
        Action::CreateInvoice,
        Action::CreateCashInvoice,
        Action::CreateCreditNote,
        Action::CreateDebitNote,
    ];

    pub fn parse(s: &str) -> Option<Action> {
        Self::ALL.into_iter().find(|a| a.as_str() == s)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::List => "list",
            Action::Get => "get",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::ChangeState => "change-state",
            Action::EmailDocument => "email-document",
            Action::RelatedDocuments => "related_documents",
            Action::Invoices => "invoices",
            Action::FindByName => "find-by-name",
            Action::FindByCode => "find-by-code",
            Action::CreateInvoice => "create-invoice",
            Action::CreateCashInvoice => "create-cash-invoice",
            Action::CreateCreditNote => "create-credit-note",
            Action::CreateDebitNote => "create-debit-note",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `entity.action` method token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodToken {
    pub entity: Entity,
    pub action: Action,
}

impl MethodToken {
    pub fn parse(token: &str) -> Result<MethodToken, ApiError> {
        if token.trim().is_empty() {
            return Err(ApiError::Configuration(
                "no API method given; expected `entity.action`".to_string(),
            ));
        }
        let (entity, action) = match token.split_once('.') {
            Some((e, a)) if !e.is_empty() && !a.is_empty() && !a.contains('.') => (e, a),
            _ => return Err(ApiError::MalformedMethodToken(token.to_string())),
        };
        let entity =
            Entity::parse(entity).ok_or_else(|| ApiError::UnsupportedEntity(entity.to_string()))?;
        let action = Action::parse(action).ok_or_else(|| ApiError::UnsupportedAction {
            entity: entity.to_string(),
            action: action.to_string(),
        })?;
        Ok(MethodToken { entity, action })
    }
}

impl fmt::Display for MethodToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.entity, self.action)
    }
}

/// How the URL path is derived from entity, action and resource id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    /// `{entity}`
    Collection,
    /// `{entity}/{id}`
    Member,
    /// `{entity}/{id}/{action}`
    MemberAction,
    /// `{entity}/{action}?{parameter}={extra}`
    Finder { parameter: &'static str },
    /// `{entity}/{id}/{prefix}/{suffix}`, split on the action's first hyphen.
    Composite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Rule {
    method: HttpMethod,
    shape: Shape,
}

const fn rule(method: HttpMethod, shape: Shape) -> Rule {
    Rule { method, shape }
}

const INVOICE_RULES: &[(Action, Rule)] = &[
    (Action::Create, rule(HttpMethod::Post, Shape::Collection)),
    (Action::List, rule(HttpMethod::Get, Shape::Collection)),
    (Action::ChangeState, rule(HttpMethod::Put, Shape::MemberAction)),
    (Action::EmailDocument, rule(HttpMethod::Put, Shape::MemberAction)),
    (Action::Get, rule(HttpMethod::Get, Shape::Member)),
    (Action::Update, rule(HttpMethod::Put, Shape::Member)),
    (Action::RelatedDocuments, rule(HttpMethod::Get, Shape::MemberAction)),
];

// Composite client actions stay on GET; the upstream wrapper never switched
// them to POST.
const CLIENT_RULES: &[(Action, Rule)] = &[
    (Action::Create, rule(HttpMethod::Post, Shape::Collection)),
    (Action::List, rule(HttpMethod::Get, Shape::Collection)),
    (Action::Get, rule(HttpMethod::Get, Shape::Member)),
    (Action::Update, rule(HttpMethod::Put, Shape::Member)),
    (Action::Invoices, rule(HttpMethod::Get, Shape::MemberAction)),
    (
        Action::FindByName,
        rule(HttpMethod::Get, Shape::Finder { parameter: "client_name" }),
    ),
    (
        Action::FindByCode,
        rule(HttpMethod::Get, Shape::Finder { parameter: "client_code" }),
    ),
    (Action::CreateInvoice, rule(HttpMethod::Get, Shape::Composite)),
    (Action::CreateCashInvoice, rule(HttpMethod::Get, Shape::Composite)),
    (Action::CreateCreditNote, rule(HttpMethod::Get, Shape::Composite)),
    (Action::CreateDebitNote, rule(HttpMethod::Get, Shape::Composite)),
];

const ITEM_RULES: &[(Action, Rule)] = &[
    (Action::List, rule(HttpMethod::Get, Shape::Collection)),
    (Action::Create, rule(HttpMethod::Post, Shape::Collection)),
    (Action::Get, rule(HttpMethod::Get, Shape::Member)),
    (Action::Update, rule(HttpMethod::Put, Shape::Member)),
    (Action::Delete, rule(HttpMethod::Delete, Shape::Member)),
];

/// The resolved verb, path and defaults for one call.
///
/// `path` is relative to the API base and has no `.json` suffix. `query`
/// holds plan-level parameters that precede `api_key` in the final URL.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    pub method: HttpMethod,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub default_args: Arguments,
}

/// Resolve a method token into a `RequestPlan`.
pub fn resolve(
    token: MethodToken,
    resource_id: Option<u64>,
    extra_query_value: Option<&str>,
) -> Result<RequestPlan, ApiError> {
    let MethodToken { entity, action } = token;
    let rule = entity
        .rules()
        .iter()
        .find(|(a, _)| *a == action)
        .map(|(_, r)| *r)
        .ok_or_else(|| ApiError::UnsupportedAction {
            entity: entity.to_string(),
            action: action.to_string(),
        })?;

    let id = || {
        resource_id.ok_or_else(|| ApiError::MissingResourceId {
            entity: entity.to_string(),
            action: action.to_string(),
        })
    };

    let mut query = Vec::new();
    let path = match rule.shape {
        Shape::Collection => entity.to_string(),
        Shape::Member => format!("{entity}/{}", id()?),
        Shape::MemberAction => format!("{entity}/{}/{action}", id()?),
        Shape::Finder { parameter } => {
            let value = extra_query_value.ok_or_else(|| ApiError::MissingQueryValue {
                entity: entity.to_string(),
                action: action.to_string(),
                parameter: parameter.to_string(),
            })?;
            query.push((parameter.to_string(), value.to_string()));
            format!("{entity}/{action}")
        }
        Shape::Composite => {
            let (prefix, suffix) = action
                .as_str()
                .split_once('-')
                .unwrap_or((action.as_str(), ""));
            format!("{entity}/{}/{prefix}/{suffix}", id()?)
        }
    };

    Ok(RequestPlan {
        method: rule.method,
        path,
        query,
        default_args: default_args(entity, action),
    })
}

fn default_args(entity: Entity, action: Action) -> Arguments {
    match (entity, action) {
        (Entity::Invoices, Action::List) => Arguments::new()
            .with("non_archived", "true")
            .with(
                "type",
                json!([
                    "Invoice",
                    "InvoiceReceipt",
                    "SimplifiedInvoice",
                    "CreditNotes",
                    "DebitNotes"
                ]),
            )
            .with(
                "status",
                json!(["draft", "sent", "settled", "canceled", "second_copy"]),
            ),
        _ => Arguments::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan(token: &str, id: Option<u64>, extra: Option<&str>) -> Result<RequestPlan, ApiError> {
        resolve(MethodToken::parse(token)?, id, extra)
    }

    #[test]
    fn invoice_like_entities_share_one_table() {
        for entity in Entity::ALL.into_iter().filter(|e| e.is_invoice_like()) {
            let p = plan(&format!("{entity}.change-state"), Some(7), None).unwrap();
            assert_eq!(p.method, HttpMethod::Put);
            assert_eq!(p.path, format!("{entity}/7/change-state"));

            let p = plan(&format!("{entity}.create"), None, None).unwrap();
            assert_eq!(p.method, HttpMethod::Post);
            assert_eq!(p.path, entity.as_str());
        }
    }

    #[test]
    fn only_invoice_list_gets_defaults() {
        let p = plan("invoices.list", None, None).unwrap();
        assert_eq!(p.method, HttpMethod::Get);
        assert_eq!(p.path, "invoices");
        assert_eq!(p.default_args.get("non_archived"), Some(&json!("true")));
        assert_eq!(p.default_args.get("type").unwrap().as_array().unwrap().len(), 5);
        assert_eq!(
            p.default_args.get("status"),
            Some(&json!(["draft", "sent", "settled", "canceled", "second_copy"]))
        );

        assert!(plan("credit_notes.list", None, None).unwrap().default_args.is_empty());
        assert!(plan("invoices.get", Some(1), None).unwrap().default_args.is_empty());
    }

    #[test]
    fn composite_action_splits_on_first_hyphen_only() {
        let p = plan("clients.create-credit-note", Some(42), None).unwrap();
        assert_eq!(p.method, HttpMethod::Get);
        assert_eq!(p.path, "clients/42/create/credit-note");

        let p = plan("clients.create-cash-invoice", Some(3), None).unwrap();
        assert_eq!(p.path, "clients/3/create/cash-invoice");
    }

    #[test]
    fn finder_carries_query_parameter() {
        let p = plan("clients.find-by-code", None, Some("Ni Hao")).unwrap();
        assert_eq!(p.path, "clients/find-by-code");
        assert_eq!(p.query, vec![("client_code".to_string(), "Ni Hao".to_string())]);

        let p = plan("clients.find-by-name", None, Some("Acme")).unwrap();
        assert_eq!(p.query[0].0, "client_name");
    }

    #[test]
    fn finder_without_value_is_rejected() {
        let err = plan("clients.find-by-name", None, None).unwrap_err();
        assert!(matches!(err, ApiError::MissingQueryValue { ref parameter, .. } if parameter == "client_name"));
    }

    #[test]
    fn member_paths_require_an_id() {
        let err = plan("items.delete", None, None).unwrap_err();
        assert!(matches!(err, ApiError::MissingResourceId { .. }));
    }

    #[test]
    fn actions_outside_their_group_are_unsupported() {
        for token in ["items.invoices", "invoices.delete", "clients.change-state", "items.find-by-code"] {
            let err = plan(token, Some(1), Some("x")).unwrap_err();
            assert!(matches!(err, ApiError::UnsupportedAction { .. }), "{token}");
        }
        let err = plan("invoices.archive", Some(1), None).unwrap_err();
        assert_eq!(
            err,
            ApiError::UnsupportedAction {
                entity: "invoices".to_string(),
                action: "archive".to_string()
            }
        );
    }

    #[test]
    fn unknown_entity_is_unsupported() {
        let err = MethodToken::parse("document.get").unwrap_err();
        assert_eq!(err, ApiError::UnsupportedEntity("document".to_string()));
    }

    #[test]
    fn token_shape_is_validated() {
        assert!(matches!(MethodToken::parse(""), Err(ApiError::Configuration(_))));
        for bad in ["invoices", "invoices.", ".list", "invoices.list.extra"] {
            assert!(
                matches!(MethodToken::parse(bad), Err(ApiError::MalformedMethodToken(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn resolve_is_deterministic() {
        let a = plan("invoices.list", None, None).unwrap();
        let b = plan("invoices.list", None, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn token_display_round_trips() {
        let token = MethodToken::parse("clients.create-debit-note").unwrap();
        assert_eq!(token.to_string(), "clients.create-debit-note");
    }
}
