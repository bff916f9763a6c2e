use crate::modules::graph::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/graph")
            .service(list_friends)
            .service(list_group_friends)
            .service(list_blocked)
            .service(list_incoming_requests)
            .service(list_outgoing_requests),
    );
}
