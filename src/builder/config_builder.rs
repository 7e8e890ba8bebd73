//! Service list → desired proxy configuration.

use crate::builder::address::is_valid_address;
use crate::builder::model::{Backend, DesiredState, Frontend, BACKEND_TAG, FRONTEND_TAG};
use crate::registry::Service;

/// Main backend of a service: every valid address.
pub fn main_backend_id(service: &str) -> String {
    format!("{}{}", BACKEND_TAG, service)
}

/// Single-server backend of one service instance.
pub fn instance_backend_id(service: &str, server_id: &str) -> String {
    format!("{}{}:{}", BACKEND_TAG, service, server_id)
}

/// Build the desired configuration for a set of services.
///
/// Pure and order-independent: any permutation of `services` yields an equal
/// result.
pub fn build(services: &[Service]) -> DesiredState {
    let mut ordered: Vec<&Service> = services.iter().collect();
    ordered.sort_by(|a, b| a.name.cmp(&b.name));

    let mut state = DesiredState::default();
    for service in ordered {
        add_service(&mut state, service);
    }
    state
}

fn add_service(state: &mut DesiredState, service: &Service) {
    let name = service.name.as_str();
    let main_id = main_backend_id(name);
    let failover = service.failover_predicate.as_deref();

    let mut main = Backend::default();
    for (server_id, address) in &service.addresses {
        let mut instance = Backend::default();
        if is_valid_address(address) {
            main.servers.insert(server_id.clone(), address.clone());
            instance.servers.insert(server_id.clone(), address.clone());
        } else {
            tracing::warn!(service = %name, server = %server_id, address = %address, "Skipping invalid server address");
        }
        let instance_id = instance_backend_id(name, server_id);

        if service.has_health_check {
            let prefix = format!("/health/{}-{}", name, server_id);
            state.frontends.insert(
                format!("{}health:{}:{}", FRONTEND_TAG, name, server_id),
                Frontend::http(&instance_id, format!("Path(`{}/__health`)", prefix))
                    .with_rewrite(format!("^{}(.*)", regex::escape(&prefix)), "$1"),
            );
        }
        state.backends.insert(instance_id, instance);
    }
    state.backends.insert(main_id.clone(), main);

    state.frontends.insert(
        format!("{}byhost:{}", FRONTEND_TAG, name),
        Frontend::http(&main_id, format!("Host(`{}`) && PathRegexp(`/.*`)", name))
            .with_failover_predicate(failover),
    );

    let internal_prefix = format!("/__{}", name);
    state.frontends.insert(
        format!("{}internal:{}", FRONTEND_TAG, name),
        Frontend::http(&main_id, format!("PathRegexp(`{}/.*`)", internal_prefix))
            .with_rewrite(format!("^{}(.*)", regex::escape(&internal_prefix)), "$1"),
    );

    for (path_name, pattern) in &service.path_prefixes {
        let route = match service.path_hosts.get(path_name) {
            Some(host) => format!("Host(`{}`) && PathRegexp(`{}`)", host, pattern),
            None => format!("PathRegexp(`{}`)", pattern),
        };
        state.frontends.insert(
            format!("{}{}:path:{}", FRONTEND_TAG, name, path_name),
            Frontend::http(&main_id, route).with_failover_predicate(failover),
        );
    }
}
