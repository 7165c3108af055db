// self
use crate::{
	_prelude::*,
	auth::{IssuedTokens, SessionTokens},
	http::{HttpTransport, TransportErrorMapper},
	obs::Operation,
	session::Session,
};

#[derive(Deserialize)]
struct AnonymousEnvelope {
	response: IssuedTokens,
}

impl<C, M> Session<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	// Caller holds the auth queue.
	pub(super) async fn mint_anonymous(&self) -> Result<SessionTokens> {
		const OPERATION: Operation = Operation::AnonymousMint;

		self.observe(OPERATION, "mint_anonymous", async {
			let response = self
				.auth_call(
					OPERATION,
					"INSTANCE/ProjectUser".into(),
					("projectId", self.config.project_id.as_str()),
				)
				.await?;
			let envelope = response
				.json::<AnonymousEnvelope>()
				.map_err(|e| Error::auth_network(OPERATION.as_str(), e.into()))?;

			self.persist(envelope.response).await
		})
		.await
	}
}
