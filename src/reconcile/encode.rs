//! Encoding of the desired state into the proxy's key/value schema.
//!
//! ```text
//! backends/{be}/backend              {"Type":"http","Settings":{...}}
//! backends/{be}/servers/{id}         {"url":"host:port"}
//! frontends/{fe}/frontend            {"Type":"http","BackendId":..,"Route":..,"Settings":{"FailoverPredicate":..}}
//! frontends/{fe}/middlewares/rewrite {"Id":"rewrite","Type":"rewrite","Priority":1,"Middleware":{..}}
//! ```
//!
//! Field order is fixed by struct declaration order, so equal states encode
//! to byte-identical values.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::builder::model::{Backend, DesiredState, Frontend, RewriteRule};
use crate::reconcile::layout::ProxyLayout;

const REWRITE: &str = "rewrite";

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BackendRecord<'a> {
    #[serde(rename = "Type")]
    kind: &'a str,
    settings: BackendSettings,
}

/// Connection pool parameters shared by every generated backend.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BackendSettings {
    timeouts: Timeouts,
    keep_alive: KeepAlive,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct Timeouts {
    read: &'static str,
    dial: &'static str,
    #[serde(rename = "TLSHandshake")]
    tls_handshake: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct KeepAlive {
    period: &'static str,
    max_idle_conns_per_host: u32,
}

const POOL_SETTINGS: BackendSettings = BackendSettings {
    timeouts: Timeouts {
        read: "50s",
        dial: "5s",
        tls_handshake: "10s",
    },
    keep_alive: KeepAlive {
        period: "30s",
        max_idle_conns_per_host: 12,
    },
};

#[derive(Serialize)]
struct ServerRecord<'a> {
    url: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FrontendRecord<'a> {
    #[serde(rename = "Type")]
    kind: &'a str,
    backend_id: &'a str,
    route: &'a str,
    settings: FrontendSettings<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct FrontendSettings<'a> {
    failover_predicate: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct MiddlewareRecord<'a> {
    id: &'a str,
    #[serde(rename = "Type")]
    kind: &'a str,
    priority: u32,
    middleware: RewriteSettings<'a>,
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct RewriteSettings<'a> {
    regexp: &'a str,
    replacement: &'a str,
}

/// Flatten `state` into absolute key → JSON value.
pub fn encode(state: &DesiredState, layout: &ProxyLayout) -> Result<BTreeMap<String, String>, serde_json::Error> {
    let mut conf = BTreeMap::new();
    for (name, backend) in &state.backends {
        encode_backend(&mut conf, layout, name, backend)?;
    }
    for (name, frontend) in &state.frontends {
        encode_frontend(&mut conf, layout, name, frontend)?;
    }
    Ok(conf)
}

fn encode_backend(
    conf: &mut BTreeMap<String, String>,
    layout: &ProxyLayout,
    name: &str,
    backend: &Backend,
) -> Result<(), serde_json::Error> {
    let record = BackendRecord {
        kind: crate::builder::model::HTTP,
        settings: POOL_SETTINGS,
    };
    conf.insert(layout.backend_key(name), serde_json::to_string(&record)?);
    for (id, url) in &backend.servers {
        conf.insert(
            layout.server_key(name, id),
            serde_json::to_string(&ServerRecord { url })?,
        );
    }
    Ok(())
}

fn encode_frontend(
    conf: &mut BTreeMap<String, String>,
    layout: &ProxyLayout,
    name: &str,
    frontend: &Frontend,
) -> Result<(), serde_json::Error> {
    let record = FrontendRecord {
        kind: frontend.kind,
        backend_id: &frontend.backend_id,
        route: &frontend.route,
        settings: FrontendSettings {
            failover_predicate: &frontend.failover_predicate,
        },
    };
    conf.insert(layout.frontend_key(name), serde_json::to_string(&record)?);

    if let Some(RewriteRule { pattern, replacement }) = &frontend.rewrite {
        let record = MiddlewareRecord {
            id: REWRITE,
            kind: REWRITE,
            priority: 1,
            middleware: RewriteSettings {
                regexp: pattern,
                replacement,
            },
        };
        conf.insert(layout.middleware_key(name, REWRITE), serde_json::to_string(&record)?);
    }
    Ok(())
}
