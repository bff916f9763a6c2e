use crate::modules::group::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/groups")
            .service(create_group)
            .service(list_groups)
            .service(clear_member)
            .service(assign_member)
            .service(delete_group),
    );
}
