use rocket::{
    http::{Cookie, CookieJar, Status},
    serde::json::Json,
    Route, State,
};

use crate::{
    error::{Error, Result},
    model::{
        api::auth::{
            Admin, AuthToken, Credentials, Registration, Rights, SessionDescription, Voter,
            AUTH_TOKEN_COOKIE,
        },
        db::{
            profile::{NewProfile, Profile, ProfileCore},
            role::{is_admin, RoleGrant},
        },
        mongodb::{is_duplicate_key_error, Coll, Id},
    },
    Config,
};

use super::common::profile_by_id;

pub fn routes() -> Vec<Route> {
    routes![
        register,
        login,
        authenticate_admin,
        voter_session,
        admin_session,
        no_session,
        logout
    ]
}

/// Find the profile matching the given credentials.
async fn check_credentials(
    credentials: &Credentials,
    profiles: &Coll<Profile>,
) -> Result<Profile> {
    let invalid = || Error::unauthorized("Invalid credentials");
    let email = credentials.normalized_email().map_err(|_| invalid())?;
    profiles
        .find_one(ProfileCore::with_email(&email), None)
        .await?
        .filter(|profile| profile.verify_password(&credentials.password))
        .ok_or_else(invalid)
}

#[post("/auth/register", data = "<registration>", format = "json")]
async fn register(
    cookies: &CookieJar<'_>,
    registration: Json<Registration>,
    profiles: Coll<Profile>,
    config: &State<Config>,
) -> Result<Json<SessionDescription>> {
    let profile = Profile {
        id: Id::new(),
        profile: NewProfile::try_from(registration.0)?,
    };
    match profiles.insert_one(&profile, None).await {
        Ok(_) => {}
        Err(e) if is_duplicate_key_error(&e) => {
            return Err(Error::bad_request("An account with this email already exists"));
        }
        Err(e) => return Err(e.into()),
    }
    info!("Registered profile {}", profile.id);

    cookies.add(AuthToken::<Voter>::new(&profile).into_cookie(config));
    Ok(Json(SessionDescription::new(profile, Rights::Voter)))
}

#[post("/auth/login", data = "<credentials>", format = "json")]
async fn login(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    profiles: Coll<Profile>,
    config: &State<Config>,
) -> Result<Json<SessionDescription>> {
    let profile = check_credentials(&credentials, &profiles).await?;

    cookies.add(AuthToken::<Voter>::new(&profile).into_cookie(config));
    Ok(Json(SessionDescription::new(profile, Rights::Voter)))
}

#[post("/auth/admin", data = "<credentials>", format = "json")]
async fn authenticate_admin(
    cookies: &CookieJar<'_>,
    credentials: Json<Credentials>,
    profiles: Coll<Profile>,
    grants: Coll<RoleGrant>,
    config: &State<Config>,
) -> Result<Json<SessionDescription>> {
    let profile = check_credentials(&credentials, &profiles).await?;
    if !is_admin(&grants, profile.id).await? {
        return Err(Error::unauthorized("You do not have admin access"));
    }

    cookies.add(AuthToken::<Admin>::new(&profile).into_cookie(config));
    Ok(Json(SessionDescription::new(profile, Rights::Admin)))
}

#[get("/auth/session")]
async fn voter_session(
    token: AuthToken<Voter>,
    profiles: Coll<Profile>,
) -> Result<Json<SessionDescription>> {
    let profile = profile_by_id(&profiles, token.id).await?;
    Ok(Json(SessionDescription::new(profile, token.rights)))
}

#[get("/auth/session", rank = 2)]
async fn admin_session(
    token: AuthToken<Admin>,
    profiles: Coll<Profile>,
) -> Result<Json<SessionDescription>> {
    let profile = profile_by_id(&profiles, token.id).await?;
    Ok(Json(SessionDescription::new(profile, token.rights)))
}

#[get("/auth/session", rank = 3)]
fn no_session() -> Error {
    Error::unauthorized("Not signed in")
}

#[delete("/auth")]
fn logout(cookies: &CookieJar<'_>) -> Status {
    cookies.remove(Cookie::named(AUTH_TOKEN_COOKIE));
    Status::Ok
}

#[cfg(test)]
mod tests {
    use mongodb::bson::doc;
    use rocket::{
        http::ContentType,
        local::asynchronous::Client,
        serde::json::{serde_json, serde_json::json},
    };

    use crate::model::db::{
        profile::EXAMPLE_PASSWORD,
        role::NewRoleGrant,
    };

    use super::*;

    async fn session(client: &Client) -> (Status, serde_json::Value) {
        let response = client.get(uri!(voter_session)).dispatch().await;
        let status = response.status();
        let body = response.into_string().await.unwrap_or_default();
        (status, serde_json::from_str(&body).unwrap_or_default())
    }

    #[backend_test]
    async fn register_then_session(client: Client, profiles: Coll<Profile>) {
        let response = client
            .post(uri!(register))
            .header(ContentType::JSON)
            .body(json!(Registration::example()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let stored = profiles
            .find_one(ProfileCore::with_email("new.voter@example.com"), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.full_name.as_deref(), Some("Nina Newcomer"));

        let (status, body) = session(&client).await;
        assert_eq!(Status::Ok, status);
        assert_eq!(body["email"], "new.voter@example.com");
        assert_eq!(body["rights"], "voter");
    }

    #[backend_test]
    async fn duplicate_registration(client: Client, profiles: Coll<Profile>) {
        for expected in [Status::Ok, Status::BadRequest] {
            let response = client
                .post(uri!(register))
                .header(ContentType::JSON)
                .body(json!(Registration::example()).to_string())
                .dispatch()
                .await;
            assert_eq!(expected, response.status());
        }
        assert_eq!(profiles.count_documents(None, None).await.unwrap(), 1);
    }

    #[backend_test]
    async fn login_valid_and_invalid(client: Client, new_profiles: Coll<NewProfile>) {
        new_profiles
            .insert_one(NewProfile::example(), None)
            .await
            .unwrap();

        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!(Credentials::empty()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));

        let wrong_password = json!({
            "email": "voter@example.com",
            "password": "not the password",
        });
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(wrong_password.to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        let body: serde_json::Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["error"], "Invalid credentials");

        // Email matching ignores case and surrounding whitespace.
        let response = client
            .post(uri!(login))
            .header(ContentType::JSON)
            .body(json!({ "email": " VOTER@example.com", "password": EXAMPLE_PASSWORD }).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());
    }

    #[backend_test]
    async fn admin_login_requires_grant(
        client: Client,
        profiles: Coll<Profile>,
        new_grants: Coll<NewRoleGrant>,
    ) {
        let profile = Profile {
            id: Id::new(),
            profile: NewProfile::example_admin(),
        };
        profiles.insert_one(&profile, None).await.unwrap();

        let response = client
            .post(uri!(authenticate_admin))
            .header(ContentType::JSON)
            .body(json!(Credentials::example_admin()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Unauthorized, response.status());
        let body: serde_json::Value =
            serde_json::from_str(&response.into_string().await.unwrap()).unwrap();
        assert_eq!(body["error"], "You do not have admin access");

        new_grants
            .insert_one(NewRoleGrant::admin(profile.id), None)
            .await
            .unwrap();
        let response = client
            .post(uri!(authenticate_admin))
            .header(ContentType::JSON)
            .body(json!(Credentials::example_admin()).to_string())
            .dispatch()
            .await;
        assert_eq!(Status::Ok, response.status());

        let (status, body) = session(&client).await;
        assert_eq!(Status::Ok, status);
        assert_eq!(body["rights"], "admin");
    }

    #[backend_test(admin)]
    async fn revoked_grant_ends_admin_session(client: Client, grants: Coll<RoleGrant>) {
        let (status, _) = session(&client).await;
        assert_eq!(Status::Ok, status);

        grants.delete_many(doc! {}, None).await.unwrap();
        let (status, body) = session(&client).await;
        assert_eq!(Status::Unauthorized, status);
        assert_eq!(body["error"], "Not signed in");
    }

    #[backend_test(voter)]
    async fn logout_voter(client: Client) {
        assert!(client.cookies().get(AUTH_TOKEN_COOKIE).is_some());

        let response = client.delete(uri!(logout)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
        assert_eq!(None, client.cookies().get(AUTH_TOKEN_COOKIE));

        let (status, _) = session(&client).await;
        assert_eq!(Status::Unauthorized, status);
    }

    #[backend_test]
    async fn logout_not_logged_in(client: Client) {
        let response = client.delete(uri!(logout)).dispatch().await;
        assert_eq!(Status::Ok, response.status());
    }
}
