// self
use crate::{
	_prelude::*,
	auth::SessionTokens,
	http::{HttpTransport, TransportErrorMapper},
	obs::{self, Operation},
	session::Session,
};

impl<C, M> Session<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Notifies the backend (best effort) and clears the stored record and response cache.
	///
	/// A failed notification is logged and ignored. Only a failure to clear local storage is
	/// returned.
	pub async fn sign_out(&self) -> Result<()> {
		const OPERATION: Operation = Operation::SignOut;

		let _queue = self.auth_queue.lock().await;

		self.observe(OPERATION, "sign_out", async {
			match self.load_tokens().await {
				Ok(Some(tokens)) => self.notify_sign_out(OPERATION, &tokens).await,
				Ok(None) => {},
				Err(e) => obs::record_swallowed_sign_out(&e),
			}

			self.forget().await
		})
		.await
	}

	async fn notify_sign_out(&self, operation: Operation, tokens: &SessionTokens) {
		let Some(user_id) = tokens.user_id() else {
			obs::record_sign_out_without_user(self.credentials.key());

			return;
		};
		let path = format!("CALL/ProjectUser/signOut/{}_{user_id}", self.config.project_id);

		if let Err(e) = self
			.auth_call(operation, path, ("accessToken", tokens.record.access_token.expose()))
			.await
		{
			obs::record_swallowed_sign_out(&e);
		}
	}
}
