use crate::modules::friend::handle::*;
use actix_web::web::{scope, ServiceConfig};

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/friends")
            .service(list_status_codes)
            .service(send_friend_request)
            .service(accept_friend_request)
            .service(reject_friend_request)
            .service(block_user)
            .service(unblock_user)
            .service(remove_friend)
            .service(get_status)
            .service(get_history),
    );
}
