use actix::Handler;
use diesel::{ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl, SelectableHelper};

use crate::errors::{ServiceError, ServiceResult};
use crate::services::db_models::Parameter;
use crate::services::db_utils::PgActor;
use crate::services::messages::{CreateParameter, DeleteParameter, FetchParameter, FetchParameters, UpdateParameter};

fn parameter_not_found() -> ServiceError {
    ServiceError::NotFound("Parameter".into())
}

impl Handler<FetchParameters> for PgActor {
    type Result = ServiceResult<Vec<Parameter>>;

    fn handle(&mut self, _msg: FetchParameters, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::parameters::dsl::{name, parameters};

        let mut conn = self.connection()?;

        Ok(parameters.order(name.asc()).select(Parameter::as_select()).load(&mut conn)?)
    }
}

impl Handler<FetchParameter> for PgActor {
    type Result = ServiceResult<Parameter>;

    fn handle(&mut self, msg: FetchParameter, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::parameters::dsl::parameters;

        let mut conn = self.connection()?;

        parameters
            .find(msg.0)
            .select(Parameter::as_select())
            .first(&mut conn)
            .optional()?
            .ok_or_else(parameter_not_found)
    }
}

impl Handler<CreateParameter> for PgActor {
    type Result = ServiceResult<Parameter>;

    fn handle(&mut self, msg: CreateParameter, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::parameters::dsl::{id, name, parameters};

        let new_parameter = msg.0;
        if new_parameter.name.trim().is_empty() {
            return Err(ServiceError::validation("name", "This field may not be blank."));
        }
        let mut conn = self.connection()?;

        conn.build_transaction().run(|trx_conn| -> ServiceResult<_> {
            let taken = parameters
                .filter(name.eq(&new_parameter.name))
                .select(id)
                .first::<i64>(trx_conn)
                .optional()?;
            if taken.is_some() {
                return Err(ServiceError::validation("name", "parameter with this name already exists."));
            }

            Ok(diesel::insert_into(parameters)
                .values(&new_parameter)
                .returning(Parameter::as_returning())
                .get_result(trx_conn)?)
        })
    }
}

impl Handler<UpdateParameter> for PgActor {
    type Result = ServiceResult<Parameter>;

    fn handle(&mut self, msg: UpdateParameter, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::parameters::dsl::parameters;

        let mut conn = self.connection()?;

        let parameter = diesel::update(parameters.find(msg.id))
            .set(&msg.changes)
            .returning(Parameter::as_returning())
            .get_result(&mut conn)
            .optional()?
            .ok_or_else(parameter_not_found)?;

        tracing::info!(name = %parameter.name, value = %parameter.value, "parameter updated");
        Ok(parameter)
    }
}

impl Handler<DeleteParameter> for PgActor {
    type Result = ServiceResult<()>;

    fn handle(&mut self, msg: DeleteParameter, _ctx: &mut Self::Context) -> Self::Result {
        use crate::schema::parameters::dsl::parameters;

        let mut conn = self.connection()?;

        match diesel::delete(parameters.find(msg.0)).execute(&mut conn)? {
            0 => Err(parameter_not_found()),
            _ => Ok(()),
        }
    }
}
