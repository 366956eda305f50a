mod common;

use common::{new_user, TestApp, PASSWORD};
use warbler::{
    db::DbError,
    follows::Follow,
    likes::Like,
    messages::Message,
    users::{ProfileUpdate, User, DEFAULT_HEADER_IMAGE_URL, DEFAULT_IMAGE_URL},
};

#[tokio::test]
async fn user_model_starts_empty() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;

    let user = User::create(&mut conn, &new_user("testuser")).await.unwrap();

    assert!(user.messages(&mut conn).await.unwrap().is_empty());
    assert!(user.followers(&mut conn, 100, 0).await.unwrap().is_empty());
    assert!(user.following(&mut conn, 100, 0).await.unwrap().is_empty());
    assert_eq!(user.image_url, DEFAULT_IMAGE_URL);
    assert_eq!(user.header_image_url, DEFAULT_HEADER_IMAGE_URL);

    let fetched = User::find(&mut conn, user.id).await.unwrap().unwrap();
    assert_eq!(fetched.username, "testuser");
    assert_eq!(fetched.email, "testuser@test.com");
    assert_eq!(fetched.password, "HASHED_PASSWORD");
}

#[tokio::test]
async fn display_shows_id_username_and_email() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;

    let user = User::create(&mut conn, &new_user("testuser")).await.unwrap();

    assert_eq!(
        user.to_string(),
        format!("<User #{}: testuser, testuser@test.com>", user.id)
    );
}

#[tokio::test]
async fn is_following_detects_follow() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;

    let dan = User::create(&mut conn, &new_user("dan")).await.unwrap();
    let trina = User::create(&mut conn, &new_user("trina")).await.unwrap();

    Follow::create(&mut conn, dan.id, trina.id).await.unwrap();

    assert!(dan.is_following(&mut conn, &trina).await.unwrap());
    assert!(!dan.is_followed_by(&mut conn, &trina).await.unwrap());
    assert!(trina.is_followed_by(&mut conn, &dan).await.unwrap());

    let following = dan.following(&mut conn, 100, 0).await.unwrap();
    assert_eq!(following.len(), 1);
    assert_eq!(following[0].id, trina.id);

    let followers = trina.followers(&mut conn, 100, 0).await.unwrap();
    assert_eq!(followers.len(), 1);
    assert_eq!(followers[0].id, dan.id);
}

#[tokio::test]
async fn is_not_following_without_follow_row() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;

    let dan = User::create(&mut conn, &new_user("dan")).await.unwrap();
    let trina = User::create(&mut conn, &new_user("trina")).await.unwrap();

    assert!(!dan.is_following(&mut conn, &trina).await.unwrap());
    assert!(!dan.is_followed_by(&mut conn, &trina).await.unwrap());
}

#[tokio::test]
async fn is_followed_by_detects_follower() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;

    let dan = User::create(&mut conn, &new_user("dan")).await.unwrap();
    let trina = User::create(&mut conn, &new_user("trina")).await.unwrap();

    Follow::create(&mut conn, trina.id, dan.id).await.unwrap();

    assert!(dan.is_followed_by(&mut conn, &trina).await.unwrap());
    assert!(!dan.is_following(&mut conn, &trina).await.unwrap());
}

#[tokio::test]
async fn duplicate_follow_is_integrity_error() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;

    let dan = User::create(&mut conn, &new_user("dan")).await.unwrap();
    let trina = User::create(&mut conn, &new_user("trina")).await.unwrap();

    Follow::create(&mut conn, dan.id, trina.id).await.unwrap();
    let err = Follow::create(&mut conn, dan.id, trina.id).await.unwrap_err();
    assert!(err.is_integrity());

    assert!(!Follow::ensure(&mut conn, dan.id, trina.id).await.unwrap());
    assert_eq!(dan.following(&mut conn, 100, 0).await.unwrap().len(), 1);

    assert!(Follow::delete(&mut conn, dan.id, trina.id).await.unwrap());
    assert!(!dan.is_following(&mut conn, &trina).await.unwrap());
}

#[tokio::test]
async fn follow_of_missing_user_is_integrity_error() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;

    let dan = User::create(&mut conn, &new_user("dan")).await.unwrap();
    let err = Follow::create(&mut conn, dan.id, uuid::Uuid::new_v4())
        .await
        .unwrap_err();
    assert!(err.is_integrity());
}

#[tokio::test]
async fn signup_hashes_password() {
    let app = TestApp::new().await;
    let user = app.signup("testuser").await;

    assert_ne!(user.password, PASSWORD);
    assert!(user.password.starts_with("$argon2"));
}

#[tokio::test]
async fn authenticate_with_valid_credentials() {
    let app = TestApp::new().await;
    let user = app.signup("testuser").await;
    let mut conn = app.conn().await;

    let found = User::authenticate(&mut conn, "testuser", PASSWORD)
        .await
        .unwrap()
        .expect("valid credentials");
    assert_eq!(found.id, user.id);
}

#[tokio::test]
async fn authenticate_with_wrong_username() {
    let app = TestApp::new().await;
    app.signup("testuser").await;
    let mut conn = app.conn().await;

    let found = User::authenticate(&mut conn, "nobody", PASSWORD).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn authenticate_with_wrong_password() {
    let app = TestApp::new().await;
    app.signup("testuser").await;
    let mut conn = app.conn().await;

    let found = User::authenticate(&mut conn, "testuser", "notthepassword")
        .await
        .unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn authenticate_against_unhashed_password_is_an_error() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;
    User::create(&mut conn, &new_user("plain")).await.unwrap();

    let err = User::authenticate(&mut conn, "plain", "HASHED_PASSWORD")
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Password(_)));
}

#[tokio::test]
async fn follow_lists_page_by_username() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;
    let dan = User::create(&mut conn, &new_user("dan")).await.unwrap();
    for name in ["carol", "alice", "bob"] {
        let follower = User::create(&mut conn, &new_user(name)).await.unwrap();
        Follow::create(&mut conn, follower.id, dan.id).await.unwrap();
    }

    let names = |users: Vec<User>| users.into_iter().map(|u| u.username).collect::<Vec<_>>();
    assert_eq!(names(dan.followers(&mut conn, 2, 0).await.unwrap()), ["alice", "bob"]);
    assert_eq!(names(dan.followers(&mut conn, 2, 2).await.unwrap()), ["carol"]);
    assert!(dan.following(&mut conn, 2, 0).await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_signup_fails_and_rolls_back() {
    let app = TestApp::new().await;
    app.signup("testuser").await;

    let mut tx = app.state.pool().begin().await.unwrap();
    let err = User::signup(
        &mut *tx,
        warbler::users::NewUser {
            username: "testuser".to_string(),
            email: "other@example.com".to_string(),
            password: PASSWORD.to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_integrity());
    tx.rollback().await.unwrap();

    let mut tx = app.state.pool().begin().await.unwrap();
    let err = User::create(
        &mut *tx,
        &warbler::users::NewUser {
            username: "someoneelse".to_string(),
            email: "testuser@example.com".to_string(),
            password: "HASHED_PASSWORD".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_integrity());
    drop(tx);

    let mut conn = app.conn().await;
    User::create(&mut conn, &new_user("fresh")).await.unwrap();
    assert_eq!(User::search(&mut conn, None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn delete_cascades_to_messages_follows_and_likes() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;

    let dan = User::create(&mut conn, &new_user("dan")).await.unwrap();
    let trina = User::create(&mut conn, &new_user("trina")).await.unwrap();

    let dans = Message::create(&mut conn, dan.id, "from dan").await.unwrap();
    let trinas = Message::create(&mut conn, trina.id, "from trina").await.unwrap();
    Follow::create(&mut conn, dan.id, trina.id).await.unwrap();
    Follow::create(&mut conn, trina.id, dan.id).await.unwrap();
    Like::create(&mut conn, dan.id, trinas.id).await.unwrap();
    Like::create(&mut conn, trina.id, dans.id).await.unwrap();

    assert!(User::delete(&mut conn, dan.id).await.unwrap());

    assert!(User::find(&mut conn, dan.id).await.unwrap().is_none());
    assert!(Message::find(&mut conn, dans.id).await.unwrap().is_none());
    assert!(trina.followers(&mut conn, 100, 0).await.unwrap().is_empty());
    assert!(trina.following(&mut conn, 100, 0).await.unwrap().is_empty());
    assert!(trinas.likes_from_users(&mut conn).await.unwrap().is_empty());
    assert!(trina.liked_messages(&mut conn).await.unwrap().is_empty());

    assert!(!User::delete(&mut conn, dan.id).await.unwrap());
}

#[tokio::test]
async fn update_profile_changes_fields() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;

    let dan = User::create(&mut conn, &new_user("dan")).await.unwrap();
    User::create(&mut conn, &new_user("trina")).await.unwrap();

    let updated = User::update_profile(
        &mut conn,
        dan.id,
        &ProfileUpdate {
            username: "daniel".to_string(),
            email: "daniel@test.com".to_string(),
            image_url: Some("/me.png".to_string()),
            bio: Some("hi".to_string()),
            location: Some("Oakland".to_string()),
            ..Default::default()
        },
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(updated.username, "daniel");
    assert_eq!(updated.image_url, "/me.png");
    assert_eq!(updated.header_image_url, DEFAULT_HEADER_IMAGE_URL);
    assert_eq!(updated.location.as_deref(), Some("Oakland"));

    let err = User::update_profile(
        &mut conn,
        dan.id,
        &ProfileUpdate {
            username: "trina".to_string(),
            email: "daniel@test.com".to_string(),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();
    assert!(err.is_integrity());
}

#[tokio::test]
async fn search_matches_username_substring() {
    let app = TestApp::new().await;
    let mut conn = app.conn().await;

    User::create(&mut conn, &new_user("dan")).await.unwrap();
    User::create(&mut conn, &new_user("danielle")).await.unwrap();
    User::create(&mut conn, &new_user("trina")).await.unwrap();

    let found = User::search(&mut conn, Some("dan")).await.unwrap();
    let names: Vec<_> = found.iter().map(|u| u.username.as_str()).collect();
    assert_eq!(names, vec!["dan", "danielle"]);

    assert_eq!(User::search(&mut conn, Some("")).await.unwrap().len(), 3);
}
