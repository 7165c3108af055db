// self
use crate::{
	_prelude::*,
	auth::{DecodeError, IssuedTokens, SessionTokens},
	http::{HttpTransport, TransportErrorMapper},
	obs::Operation,
	session::Session,
};

impl<C, M> Session<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	// Caller holds the auth queue and has checked that only the access token expired.
	// The stored record is replaced only once a decodable pair arrives.
	pub(super) async fn refresh(&self, current: SessionTokens) -> Result<SessionTokens> {
		const OPERATION: Operation = Operation::Refresh;

		self.observe(OPERATION, "refresh", async {
			let user_id = current.user_id().ok_or_else(|| Error::InvalidToken {
				source: DecodeError::Claims { message: "refresh token carries no userId".into() },
			})?;
			let path =
				format!("CALL/ProjectUser/refreshToken/{}_{user_id}", self.config.project_id);
			let response = self
				.auth_call(OPERATION, path, ("refreshToken", current.record.refresh_token.expose()))
				.await?;
			let issued = response
				.json::<IssuedTokens>()
				.map_err(|e| Error::auth_network(OPERATION.as_str(), e.into()))?;

			self.persist(issued).await
		})
		.await
	}
}
