//! OAuth provider registry
//!
//! Holds one configured OAuth client per supported provider plus the
//! HTTP client used for token exchange and profile fetches. Provider
//! endpoints are compiled in; only the credentials come from config.

use std::collections::HashMap;
use std::time::Duration;

use oauth2::basic::BasicClient;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, EndpointNotSet, EndpointSet,
    RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;
use url::Url;

use crate::config::AuthConfig;
use crate::data::{ExternalProfile, Provider};
use crate::error::AppError;

/// OAuth client type with auth URL and token URL set.
type ConfiguredClient = oauth2::Client<
    oauth2::basic::BasicErrorResponse,
    oauth2::basic::BasicTokenResponse,
    oauth2::basic::BasicTokenIntrospectionResponse,
    oauth2::StandardRevocableToken,
    oauth2::basic::BasicRevocationErrorResponse,
    EndpointSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointNotSet,
    EndpointSet,
>;

/// Static endpoint set for one provider
struct ProviderEndpoints {
    authorize_url: &'static str,
    token_url: &'static str,
    profile_url: &'static str,
    scopes: &'static [&'static str],
}

const FACEBOOK: ProviderEndpoints = ProviderEndpoints {
    authorize_url: "https://www.facebook.com/v19.0/dialog/oauth",
    token_url: "https://graph.facebook.com/v19.0/oauth/access_token",
    profile_url: "https://graph.facebook.com/v19.0/me?fields=id,name,email",
    scopes: &["email", "public_profile"],
};

const TWITTER: ProviderEndpoints = ProviderEndpoints {
    authorize_url: "https://twitter.com/i/oauth2/authorize",
    token_url: "https://api.twitter.com/2/oauth2/token",
    profile_url: "https://api.twitter.com/2/users/me?user.fields=id,name,username",
    scopes: &["users.read", "tweet.read"],
};

const GOOGLE: ProviderEndpoints = ProviderEndpoints {
    authorize_url: "https://accounts.google.com/o/oauth2/v2/auth",
    token_url: "https://oauth2.googleapis.com/token",
    profile_url: "https://openidconnect.googleapis.com/v1/userinfo",
    scopes: &["openid", "email", "profile"],
};

fn endpoints(provider: Provider) -> &'static ProviderEndpoints {
    match provider {
        Provider::Facebook => &FACEBOOK,
        Provider::Twitter => &TWITTER,
        Provider::Google => &GOOGLE,
    }
}

/// Configured OAuth clients for every supported provider
pub struct ProviderRegistry {
    clients: HashMap<Provider, ConfiguredClient>,
    http: reqwest::Client,
}

impl ProviderRegistry {
    /// Build clients for all providers from the configured credentials
    ///
    /// `public_root` is the externally visible base URL; callbacks are
    /// registered as `<public_root>/connect/<provider>/callback`.
    pub fn from_config(auth: &AuthConfig, public_root: &str) -> Result<Self, AppError> {
        // Redirects stay disabled so a provider response cannot bounce
        // the token request somewhere else.
        let http = reqwest::Client::builder()
            .user_agent(concat!("gatehouse/", env!("CARGO_PKG_VERSION")))
            .redirect(reqwest::redirect::Policy::none())
            .timeout(Duration::from_secs(30))
            .build()?;

        let root = public_root.trim_end_matches('/');
        let mut clients = HashMap::new();
        for provider in Provider::ALL {
            let credentials = auth.provider(provider);
            let endpoints = endpoints(provider);
            let redirect = format!("{}/connect/{}/callback", root, provider.as_str());

            let client = BasicClient::new(ClientId::new(credentials.client_id.clone()))
                .set_client_secret(ClientSecret::new(credentials.client_secret.clone()))
                .set_auth_uri(AuthUrl::new(endpoints.authorize_url.to_string()).map_err(
                    |e| AppError::Config(format!("invalid authorize URL for {provider:?}: {e}")),
                )?)
                .set_token_uri(TokenUrl::new(endpoints.token_url.to_string()).map_err(|e| {
                    AppError::Config(format!("invalid token URL for {provider:?}: {e}"))
                })?)
                .set_redirect_uri(RedirectUrl::new(redirect).map_err(|e| {
                    AppError::Config(format!("invalid redirect URL for {provider:?}: {e}"))
                })?);
            clients.insert(provider, client);
        }

        Ok(Self { clients, http })
    }

    fn client(&self, provider: Provider) -> Result<&ConfiguredClient, AppError> {
        self.clients
            .get(&provider)
            .ok_or_else(|| AppError::Config(format!("provider not configured: {provider:?}")))
    }

    /// Build the authorization redirect URL and its CSRF state
    pub fn authorize_url(&self, provider: Provider) -> Result<(Url, CsrfToken), AppError> {
        let mut request = self.client(provider)?.authorize_url(CsrfToken::new_random);
        for scope in endpoints(provider).scopes {
            request = request.add_scope(Scope::new((*scope).to_string()));
        }
        Ok(request.url())
    }

    /// Exchange an authorization code for an access token
    pub async fn exchange_code(
        &self,
        provider: Provider,
        code: String,
    ) -> Result<String, AppError> {
        let token_result = self
            .client(provider)?
            .exchange_code(AuthorizationCode::new(code))
            .request_async(&self.http)
            .await
            .map_err(|e| {
                AppError::OAuth(format!(
                    "{} token exchange failed: {}",
                    provider.as_str(),
                    e
                ))
            })?;

        Ok(token_result.access_token().secret().clone())
    }

    /// Fetch the signed-in user's profile from the provider API
    pub async fn fetch_profile(
        &self,
        provider: Provider,
        access_token: &str,
    ) -> Result<ExternalProfile, AppError> {
        let response = self
            .http
            .get(endpoints(provider).profile_url)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?;

        let profile = match provider {
            Provider::Facebook => response.json::<FacebookProfile>().await?.into_profile(),
            Provider::Twitter => {
                response
                    .json::<TwitterProfileEnvelope>()
                    .await?
                    .data
                    .into_profile()
            }
            Provider::Google => response.json::<GoogleProfile>().await?.into_profile(),
        };
        Ok(profile)
    }
}

/// Facebook Graph API `/me` response
#[derive(Debug, Deserialize)]
struct FacebookProfile {
    id: String,
    name: Option<String>,
    email: Option<String>,
}

impl FacebookProfile {
    fn into_profile(self) -> ExternalProfile {
        ExternalProfile {
            provider: Provider::Facebook,
            subject: self.id,
            email: self.email,
            display_name: self.name,
        }
    }
}

/// Twitter API v2 wraps the user object in a `data` field
#[derive(Debug, Deserialize)]
struct TwitterProfileEnvelope {
    data: TwitterProfile,
}

#[derive(Debug, Deserialize)]
struct TwitterProfile {
    id: String,
    name: Option<String>,
    username: Option<String>,
}

impl TwitterProfile {
    fn into_profile(self) -> ExternalProfile {
        ExternalProfile {
            provider: Provider::Twitter,
            subject: self.id,
            // The v2 users endpoint never returns an email address
            email: None,
            display_name: self.name.or(self.username),
        }
    }
}

/// Google OpenID Connect userinfo response
#[derive(Debug, Deserialize)]
struct GoogleProfile {
    sub: String,
    email: Option<String>,
    name: Option<String>,
}

impl GoogleProfile {
    fn into_profile(self) -> ExternalProfile {
        ExternalProfile {
            provider: Provider::Google,
            subject: self.sub,
            email: self.email,
            display_name: self.name,
        }
    }
}
