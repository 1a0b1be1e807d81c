use jsonwebtoken::{EncodingKey, Header, encode};
use route_authz::{
    IdentityStore,
    auth::{Claims, IdentityError, IdentityResolver, JwtIdentityResolver, MockIdentityResolver},
    models::{ResolvedIdentity, Role},
};
use std::{
    sync::Arc,
    time::{Duration, SystemTime},
};
use uuid::Uuid;

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TOKEN: &str = "session-token";

fn user_identity() -> ResolvedIdentity {
    ResolvedIdentity {
        id: Uuid::from_u128(7),
        email: "user@example.com".to_string(),
        role: Role::User,
    }
}

fn create_token(role: &str, exp_offset: i64) -> String {
    let now = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs() as i64;

    let claims = Claims {
        sub: Uuid::from_u128(42),
        email: "jwt@example.com".to_string(),
        role: role.to_string(),
        iat: now as usize,
        exp: (now + exp_offset) as usize,
    };

    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

// --- IdentityStore ---

#[tokio::test]
async fn test_resolution_is_memoized() {
    let resolver = Arc::new(MockIdentityResolver::new().with_identity(TOKEN, user_identity()));
    let store = IdentityStore::new(resolver.clone(), Duration::from_secs(60));

    assert_eq!(store.resolve(TOKEN).await, Some(user_identity()));
    assert_eq!(store.resolve(TOKEN).await, Some(user_identity()));

    assert_eq!(resolver.calls(), 1);
    assert_eq!(store.cached_sessions(), 1);
}

#[tokio::test]
async fn test_concurrent_guards_share_one_resolution() {
    let resolver = Arc::new(
        MockIdentityResolver::new()
            .with_identity(TOKEN, user_identity())
            .with_delay(Duration::from_millis(50)),
    );
    let store = Arc::new(IdentityStore::new(resolver.clone(), Duration::from_secs(60)));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { store.resolve(TOKEN).await })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap(), Some(user_identity()));
    }
    assert_eq!(resolver.calls(), 1);
}

#[tokio::test]
async fn test_failed_resolution_is_not_memoized() {
    let resolver = Arc::new(MockIdentityResolver::new().with_identity(TOKEN, user_identity()));
    let store = IdentityStore::new(resolver.clone(), Duration::from_secs(60));

    resolver.set_failing(true);
    assert_eq!(store.resolve(TOKEN).await, None);
    assert_eq!(store.cached_sessions(), 0);

    // The next navigation starts a fresh resolution.
    resolver.set_failing(false);
    assert_eq!(store.resolve(TOKEN).await, Some(user_identity()));
    assert_eq!(resolver.calls(), 2);
}

#[tokio::test]
async fn test_unknown_token_is_unauthenticated() {
    let store = IdentityStore::new(Arc::new(MockIdentityResolver::new()), Duration::from_secs(60));

    assert_eq!(store.resolve("nobody").await, None);
}

#[tokio::test]
async fn test_invalidate_forces_fresh_resolution() {
    let resolver = Arc::new(MockIdentityResolver::new().with_identity(TOKEN, user_identity()));
    let store = IdentityStore::new(resolver.clone(), Duration::from_secs(60));

    store.resolve(TOKEN).await;
    store.invalidate(TOKEN);
    assert_eq!(store.cached_sessions(), 0);

    store.resolve(TOKEN).await;
    assert_eq!(resolver.calls(), 2);
}

#[tokio::test]
async fn test_expired_entries_are_refetched() {
    let resolver = Arc::new(MockIdentityResolver::new().with_identity(TOKEN, user_identity()));
    let store = IdentityStore::new(resolver.clone(), Duration::from_millis(20));

    store.resolve(TOKEN).await;
    tokio::time::sleep(Duration::from_millis(40)).await;
    store.resolve(TOKEN).await;

    assert_eq!(resolver.calls(), 2);
}

// --- JwtIdentityResolver ---

#[tokio::test]
async fn test_jwt_resolver_success() {
    let resolver = JwtIdentityResolver::new(TEST_JWT_SECRET);

    let identity = resolver.resolve(&create_token("ADMIN", 3600)).await.unwrap();

    assert_eq!(identity.id, Uuid::from_u128(42));
    assert_eq!(identity.email, "jwt@example.com");
    assert_eq!(identity.role, Role::Admin);
}

#[tokio::test]
async fn test_jwt_resolver_rejects_expired_token() {
    let resolver = JwtIdentityResolver::new(TEST_JWT_SECRET);

    // Well past the default validation leeway.
    let result = resolver.resolve(&create_token("USER", -3600)).await;

    assert!(matches!(result, Err(IdentityError::Expired)));
}

#[tokio::test]
async fn test_jwt_resolver_rejects_wrong_secret() {
    let resolver = JwtIdentityResolver::new("some-other-secret");

    let result = resolver.resolve(&create_token("USER", 3600)).await;

    assert!(matches!(result, Err(IdentityError::InvalidToken(_))));
}

#[tokio::test]
async fn test_jwt_resolver_rejects_unknown_role() {
    let resolver = JwtIdentityResolver::new(TEST_JWT_SECRET);

    let result = resolver.resolve(&create_token("student", 3600)).await;

    assert!(matches!(result, Err(IdentityError::UnknownRole(role)) if role == "student"));
}

#[tokio::test]
async fn test_jwt_resolver_rejects_garbage() {
    let resolver = JwtIdentityResolver::new(TEST_JWT_SECRET);

    assert!(resolver.resolve("not.a.jwt").await.is_err());
}
