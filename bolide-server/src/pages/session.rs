//! Sign-in against the GitHub API with a personal access token, and the
//! matching sign-out. No local passwords, the token is the credential.

use axum::{extract::State, response::Redirect, Form, Router};
use axum_extra::routing::{RouterExt, TypedPath};
use maud::html;
use serde::Deserialize;

use bolide_core::{
    error::{BolideError, BolideResult},
    http_client,
    request_helper::{ApiFormData, ApiFormDataEmpty, BolideResponse, FormMethod, HtmlResponse},
    session::{Authenticated, Unauthenticated},
    state::{BolideRequestState, BolideState},
};
use bolide_dependencies::axum_flash::Flash;
use bolide_dependencies::chrono::Utc;
use bolide_dependencies::reqwest;
use bolide_dependencies::securefmt;
use bolide_models::User;

use crate::pages::common::frontmatter::{app, csrf_input_tag, form_method, HeaderSearch};
use crate::pages::notifications::PathNotifications;

pub fn session_pages(r: Router<BolideState>) -> Router<BolideState> {
    r.typed_get(new_session)
        .typed_post(post_new_session)
        .typed_post(post_destroy_session)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/sessions/new")]
pub struct PathNewSession {}

#[instrument(skip(state, rstate))]
pub async fn new_session(
    _: PathNewSession,
    State(state): State<BolideState>,
    rstate: BolideRequestState<Unauthenticated>,
) -> BolideResult<BolideResponse<()>> {
    if rstate.session().user_id().is_some() {
        return Ok(BolideResponse::Redirect(Redirect::to(
            &PathNotifications {}.to_uri().to_string(),
        )));
    }
    let body = html! {
        .login {
            h1 { "Sign in" }

            form action=(PathSessionsLogin {}.to_uri().to_string()) method="POST" {
                (csrf_input_tag(&rstate).await)
                (form_method(FormMethod::Create))

                p.login__explain {
                    "Bolide reads your GitHub notifications with a personal access token. "
                    "The token needs the "
                    code { "notifications" }
                    " scope and never leaves this server."
                }

                .field {
                    input.input #github_token name="token" type="password" required="true"
                        placeholder="GitHub personal access token" autofocus="true";
                }

                .actions {
                    button.button type="submit" { "Sign in" }
                }
            }
        }
    };
    let page = app(&state, &rstate, Some("Sign in".into()), &HeaderSearch::default(), body).await?;
    Ok(BolideResponse::Html(HtmlResponse {
        content: page.into_string(),
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/sessions/new")]
pub struct PathSessionsLogin {}

#[derive(serde::Deserialize, securefmt::Debug)]
pub struct NewSession {
    #[sensitive]
    token: String,
}

/// GitHub's answer to `GET /user`, reduced to what the header renders.
#[derive(serde::Deserialize, Debug)]
pub struct RemoteProfile {
    pub login: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
}

#[instrument(skip(state, rstate, flash, afd))]
pub async fn post_new_session(
    _: PathSessionsLogin,
    State(state): State<BolideState>,
    flash: Flash,
    mut rstate: BolideRequestState<Unauthenticated>,
    Form(afd): Form<ApiFormData<NewSession>>,
) -> BolideResult<(Flash, Redirect)> {
    let retry = PathSessionsLogin {}.to_uri().to_string();
    if !afd.verify_csrf(Some(FormMethod::Create), &rstate) {
        return Ok((
            flash.error("The form has expired, please retry"),
            Redirect::to(&retry),
        ));
    }
    let token = afd.data.token.trim().to_string();
    if token.is_empty() {
        return Ok((
            flash.error("Please paste a personal access token"),
            Redirect::to(&retry),
        ));
    }
    trace!("verifying token against the GitHub API");
    let profile = match verify_token(&state, &token).await? {
        Some(profile) => profile,
        None => {
            debug!("token verification came back unauthorized");
            return Ok((
                flash.error("GitHub rejected that token"),
                Redirect::to(&retry),
            ));
        }
    };
    let mut client = state.get_db_client();
    let now = Utc::now().naive_utc();
    let mut user = User::upsert_from_remote(
        &mut client,
        &profile.login,
        profile.name.as_deref(),
        profile.avatar_url.as_deref(),
        &token,
        now,
    )
    .await?;
    let session = rstate.session_mut();
    session.set_user(&user);
    rstate.push_session_update().await?;
    // start filling the inbox right away instead of waiting for the scheduler
    if let Err(e) =
        bolide_jobs::request_sync_for(&state.get_db_pool(), &mut client, &mut user, now).await
    {
        warn!("could not enqueue the first sync for {}: {}", user.login, e);
    }
    Ok((
        flash.info(format!("Signed in as {}", user.displayname())),
        Redirect::to(&PathNotifications {}.to_uri().to_string()),
    ))
}

/// Asks the API who the token belongs to. An unauthorized answer means a
/// bad token and comes back as None, anything else unexpected bubbles up.
async fn verify_token(state: &BolideState, token: &str) -> BolideResult<Option<RemoteProfile>> {
    let http = http_client(state.config())?;
    let url = state.config().github_api_base.join("user")?;
    let resp = http
        .get(url)
        .header(reqwest::header::ACCEPT, "application/vnd.github+json")
        .header(reqwest::header::AUTHORIZATION, format!("token {}", token))
        .send()
        .await?;
    if resp.status() == reqwest::StatusCode::UNAUTHORIZED
        || resp.status() == reqwest::StatusCode::FORBIDDEN
    {
        return Ok(None);
    }
    if !resp.status().is_success() {
        return Err(BolideError::GithubApi(format!(
            "profile lookup failed with status {}",
            resp.status()
        )));
    }
    Ok(Some(resp.json().await?))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/sessions/logout")]
pub struct PathSessionLogout {}

#[instrument(skip(rstate, flash, afd))]
pub async fn post_destroy_session(
    _: PathSessionLogout,
    flash: Flash,
    mut rstate: BolideRequestState<Authenticated>,
    Form(afd): Form<ApiFormDataEmpty>,
) -> BolideResult<(Flash, Redirect)> {
    let afd = afd.into_afd();
    if !afd.verify_csrf(Some(FormMethod::Delete), &rstate) {
        return Ok((
            flash.error("The form has expired, please retry"),
            Redirect::to(&PathNotifications {}.to_uri().to_string()),
        ));
    }
    let session = rstate.session_mut();
    session.unset_user();
    rstate.destroy_session().await?;
    Ok((
        flash.info("You have been signed out"),
        Redirect::to(&PathSessionsLogin {}.to_uri().to_string()),
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn github_profiles_decode_with_absent_optionals() {
        let profile: RemoteProfile = serde_json::from_str(
            r#"{
                "login": "octocat",
                "id": 583231,
                "name": null,
                "avatar_url": "https://avatars.githubusercontent.com/u/583231?v=4",
                "type": "User"
            }"#,
        )
        .unwrap();
        assert_eq!(profile.login, "octocat");
        assert_eq!(profile.name, None);
        assert_eq!(
            profile.avatar_url.as_deref(),
            Some("https://avatars.githubusercontent.com/u/583231?v=4")
        );
    }

    #[test]
    fn login_forms_never_leak_the_token_into_logs() {
        let form = NewSession {
            token: "ghp_supersecrettoken".to_string(),
        };
        let debug = format!("{:?}", form);
        assert!(!debug.contains("ghp_supersecrettoken"));
    }
}
