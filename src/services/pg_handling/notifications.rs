use actix::Handler;
use diesel::{ExpressionMethods, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::errors::{ServiceError, ServiceResult};
use crate::services::db_models::Notification;
use crate::services::db_utils::PgActor;
use crate::services::messages::{DeleteNotification, FetchNotification, FetchNotifications, MarkNotificationRead};

fn notification_not_found() -> ServiceError {
    ServiceError::NotFound("Notification".into())
}

/// A notification is only ever reachable by its recipient.
fn owned(conn: &mut PgConnection, owner: i64, pk: i64) -> ServiceResult<Notification> {
    use crate::schema::notifications::dsl::{notifications, recipient_id};

    notifications
        .find(pk)
        .filter(recipient_id.eq(owner))
        .select(Notification::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(notification_not_found)
}

impl Handler<FetchNotifications> for PgActor {
    type Result = ServiceResult<Vec<Notification>>;

    fn handle(&mut self, msg: FetchNotifications, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::notifications::dsl::{id, notifications, recipient_id, sent_at};

        let mut conn = self.connection()?;

        Ok(notifications
            .filter(recipient_id.eq(msg.0))
            .order((sent_at.desc(), id.desc()))
            .select(Notification::as_select())
            .load(&mut conn)?)
    }
}

impl Handler<FetchNotification> for PgActor {
    type Result = ServiceResult<Notification>;

    fn handle(&mut self, msg: FetchNotification, _ctx: &mut Self::Context) -> Self::Result {
        let mut conn = self.connection()?;

        owned(&mut conn, msg.user_id, msg.id)
    }
}

impl Handler<MarkNotificationRead> for PgActor {
    type Result = ServiceResult<Notification>;

    fn handle(&mut self, msg: MarkNotificationRead, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::notifications::dsl::{is_read, notifications, recipient_id};

        let mut conn = self.connection()?;

        diesel::update(notifications.find(msg.id).filter(recipient_id.eq(msg.user_id)))
            .set(is_read.eq(true))
            .returning(Notification::as_returning())
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(notification_not_found)
    }
}

impl Handler<DeleteNotification> for PgActor {
    type Result = ServiceResult<()>;

    fn handle(&mut self, msg: DeleteNotification, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::notifications::dsl::{notifications, recipient_id};

        let mut conn = self.connection()?;

        match diesel::delete(notifications.find(msg.id).filter(recipient_id.eq(msg.user_id))).execute(&mut conn)? {
            0 => Err(notification_not_found()),
            _ => Ok(()),
        }
    }
}
