// self
use crate::{
	_prelude::*,
	auth::{DecodeError, IssuedTokens, SessionTokens, decode_claims},
	http::{HttpTransport, TransportErrorMapper},
	obs::Operation,
	session::Session,
};

impl<C, M> Session<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Exchanges a one-time custom token for a session pair and persists it.
	///
	/// The user is read from the custom token's `userId` claim. Clock skew is measured from
	/// the issued access token. The response cache is cleared because the identity changed.
	pub async fn sign_in(&self, custom_token: &str) -> Result<SessionTokens> {
		const OPERATION: Operation = Operation::SignIn;

		let _queue = self.auth_queue.lock().await;

		self.observe(OPERATION, "sign_in", async {
			let claims =
				decode_claims(custom_token).map_err(|source| Error::InvalidToken { source })?;
			let user_id = claims.user_id.ok_or_else(|| Error::InvalidToken {
				source: DecodeError::Claims { message: "custom token carries no userId".into() },
			})?;
			let path = format!(
				"CALL/ProjectUser/authWithCustomToken/{}_{user_id}",
				self.config.project_id
			);
			let response = self.auth_call(OPERATION, path, ("customToken", custom_token)).await?;
			let issued = response
				.json::<IssuedTokens>()
				.map_err(|e| Error::auth_network(OPERATION.as_str(), e.into()))?;
			let tokens = self.persist(issued).await?;

			if let Some(cache) = self.dispatcher.cache() {
				cache.clear();
			}

			Ok(tokens)
		})
		.await
	}
}
