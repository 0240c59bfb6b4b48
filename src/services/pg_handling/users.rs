use actix::Handler;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::errors::{ServiceError, ServiceResult};
use crate::services::db_models::User;
use crate::services::db_utils::PgActor;
use crate::services::messages::{DeleteUser, FetchUser, FetchUsers, FindUserByEmail, RegisterUser, UpdateUser};

impl Handler<RegisterUser> for PgActor {
    type Result = ServiceResult<User>;

    fn handle(&mut self, msg: RegisterUser, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::dsl::{email, id, users};

        let mut conn = self.connection()?;
        let new_user = msg.0;

        conn.build_transaction().run(|trx_conn| -> ServiceResult<_> {
            let taken = users
                .filter(email.eq(&new_user.email))
                .select(id)
                .first::<i64>(trx_conn)
                .optional()?;
            if taken.is_some() {
                return Err(ServiceError::validation("email", "A user with this email already exists."));
            }

            let user = diesel::insert_into(users)
                .values(&new_user)
                .returning(User::as_returning())
                .get_result(trx_conn)?;

            tracing::info!(user_id = user.id, "registered new user");
            Ok(user)
        })
    }
}

impl Handler<FindUserByEmail> for PgActor {
    type Result = ServiceResult<Option<User>>;

    fn handle(&mut self, msg: FindUserByEmail, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::dsl::{email, users};

        let mut conn = self.connection()?;

        Ok(users
            .filter(email.eq(msg.0.trim().to_lowercase()))
            .select(User::as_select())
            .first(&mut conn)
            .optional()?)
    }
}

impl Handler<FetchUsers> for PgActor {
    type Result = ServiceResult<Vec<User>>;

    fn handle(&mut self, _msg: FetchUsers, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::dsl::{id, users};

        let mut conn = self.connection()?;

        Ok(users.order(id.asc()).select(User::as_select()).load(&mut conn)?)
    }
}

impl Handler<FetchUser> for PgActor {
    type Result = ServiceResult<User>;

    fn handle(&mut self, msg: FetchUser, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::dsl::users;

        let mut conn = self.connection()?;

        users
            .find(msg.0)
            .select(User::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(|| ServiceError::NotFound("User".into()))
    }
}

impl Handler<UpdateUser> for PgActor {
    type Result = ServiceResult<User>;

    fn handle(&mut self, msg: UpdateUser, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::dsl::users;

        let mut conn = self.connection()?;

        let updated = if msg.changes.is_empty() {
            users.find(msg.id).select(User::as_select()).first(&mut conn).optional()?
        } else {
            diesel::update(users.find(msg.id))
                .set(&msg.changes)
                .returning(User::as_returning())
                .get_result(&mut conn)
                .optional()?
        };

        updated.ok_or_else(|| ServiceError::NotFound("User".into()))
    }
}

impl Handler<DeleteUser> for PgActor {
    type Result = ServiceResult<()>;

    fn handle(&mut self, msg: DeleteUser, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::users::dsl::users;

        let mut conn = self.connection()?;

        match diesel::delete(users.find(msg.0)).execute(&mut conn)? {
            0 => Err(ServiceError::NotFound("User".into())),
            _ => Ok(()),
        }
    }
}
