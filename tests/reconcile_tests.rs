use recipe_api::{
    ConnectionPool, EngineError, IntentError, MemoryStore, NewRecipe, Outcome, PoolConfig,
    RecipeEngine, RecipeField, UpdateIntent,
};

async fn engine() -> (RecipeEngine<MemoryStore>, MemoryStore) {
    let store = MemoryStore::recipes();
    let pool = ConnectionPool::new(PoolConfig::default(), store.clone())
        .await
        .unwrap();
    (RecipeEngine::new(pool), store)
}

fn toast() -> NewRecipe {
    NewRecipe::new("Toast", "Simple", "").unwrap()
}

#[tokio::test]
async fn test_create_patch_delete_scenario() {
    let (engine, _) = engine().await;

    assert_eq!(engine.create(&toast()).await.unwrap(), Outcome::Created(1));

    let intent = UpdateIntent::new().with(RecipeField::Name, "Toast v2");
    assert_eq!(engine.patch(1, &intent).await.unwrap(), Outcome::Updated(1));

    let Outcome::Found(recipe) = engine.get(1).await.unwrap() else {
        panic!("recipe 1 should exist");
    };
    assert_eq!(recipe, NewRecipe::new("Toast v2", "Simple", "").unwrap().into_record(1));

    assert_eq!(engine.patch(99, &intent).await.unwrap(), Outcome::NotFound);
    assert_eq!(engine.delete(1).await.unwrap(), Outcome::Deleted(1));
    assert_eq!(engine.delete(1).await.unwrap(), Outcome::NotFound);
    assert_eq!(engine.get(1).await.unwrap(), Outcome::NotFound);
}

#[tokio::test]
async fn test_patch_on_missing_id_never_creates() {
    let (engine, store) = engine().await;
    engine.create(&toast()).await.unwrap();

    let intent = UpdateIntent::new()
        .with(RecipeField::Description, "Crunchy")
        .with(RecipeField::Photo, "toast.png");
    assert_eq!(engine.patch(42, &intent).await.unwrap(), Outcome::NotFound);
    assert_eq!(store.row_count("recipes").await.unwrap(), 1);
}

#[tokio::test]
async fn test_patch_leaves_other_fields_alone() {
    let (engine, _) = engine().await;
    engine
        .create(&NewRecipe::new("Soup", "Warm", "soup.png").unwrap())
        .await
        .unwrap();

    let intent = UpdateIntent::new().with(RecipeField::Description, "Hot");
    engine.patch(1, &intent).await.unwrap();

    let Outcome::Found(recipe) = engine.get(1).await.unwrap() else {
        panic!("recipe 1 should exist");
    };
    assert_eq!(recipe.name, "Soup");
    assert_eq!(recipe.description, "Hot");
    assert_eq!(recipe.photo, "soup.png");
}

#[tokio::test]
async fn test_replace_existing_updates_in_place() {
    let (engine, store) = engine().await;
    engine.create(&toast()).await.unwrap();

    let replacement = NewRecipe::new("Bagel", "Chewy", "bagel.png").unwrap();
    assert_eq!(
        engine.replace(1, &replacement).await.unwrap(),
        Outcome::Updated(1)
    );
    assert_eq!(store.row_count("recipes").await.unwrap(), 1);
    assert_eq!(
        engine.get(1).await.unwrap(),
        Outcome::Found(replacement.into_record(1))
    );
}

#[tokio::test]
async fn test_replace_missing_falls_back_to_insert_with_new_id() {
    let (engine, store) = engine().await;
    engine.create(&toast()).await.unwrap();

    let outcome = engine.replace(50, &toast()).await.unwrap();
    let Outcome::CreatedFallback { id, requested } = outcome else {
        panic!("expected fallback, got {outcome:?}");
    };
    assert_eq!(requested, 50);
    assert_ne!(id, 50);
    assert_eq!(id, 2);
    assert_eq!(store.row_count("recipes").await.unwrap(), 2);
    assert_eq!(engine.get(50).await.unwrap(), Outcome::NotFound);

    // Replacing the fallback row now updates it.
    assert_eq!(engine.replace(id, &toast()).await.unwrap(), Outcome::Updated(id));
}

#[tokio::test]
async fn test_large_ids_are_missing_not_errors() {
    let (engine, store) = engine().await;
    engine.create(&toast()).await.unwrap();

    let big = 3_000_000_000;
    let intent = UpdateIntent::new().with(RecipeField::Name, "Toast v2");
    assert_eq!(engine.patch(big, &intent).await.unwrap(), Outcome::NotFound);
    assert_eq!(engine.delete(big).await.unwrap(), Outcome::NotFound);
    assert_eq!(engine.get(i64::MAX).await.unwrap(), Outcome::NotFound);
    assert_eq!(
        engine.replace(big, &toast()).await.unwrap(),
        Outcome::CreatedFallback { id: 2, requested: big }
    );
    assert_eq!(store.row_count("recipes").await.unwrap(), 2);
}

#[tokio::test]
async fn test_empty_patch_is_rejected_before_the_store() {
    let (engine, _) = engine().await;
    let err = engine.patch(1, &UpdateIntent::new()).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Intent(IntentError::InvalidIntent(_))
    ));

    let stats = engine.pool().stats();
    assert_eq!(stats.total_connections, 0);
}

#[tokio::test]
async fn test_blank_name_patch_is_rejected() {
    let (engine, _) = engine().await;
    engine.create(&toast()).await.unwrap();

    let intent = UpdateIntent::new().with(RecipeField::Name, "   ");
    assert!(matches!(
        engine.patch(1, &intent).await,
        Err(EngineError::Intent(IntentError::InvalidIntent(_)))
    ));
}

#[tokio::test]
async fn test_values_with_sql_are_stored_verbatim() {
    let (engine, _) = engine().await;
    let hostile = "'); DELETE FROM recipes; --";
    let recipe = NewRecipe::new(hostile, hostile, hostile).unwrap();

    let Outcome::Created(id) = engine.create(&recipe).await.unwrap() else {
        panic!("expected create");
    };
    let all = engine.list().await.unwrap();
    assert_eq!(all, vec![recipe.into_record(id)]);
}

#[tokio::test]
async fn test_list_is_ordered_by_id() {
    let (engine, _) = engine().await;
    for name in ["a", "b", "c"] {
        engine
            .create(&NewRecipe::new(name, "", "").unwrap())
            .await
            .unwrap();
    }
    engine.delete(2).await.unwrap();

    let ids: Vec<i64> = engine.list().await.unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 3]);
}

#[tokio::test]
async fn test_store_error_surfaces_as_store_kind() {
    // A store without the recipes table fails every statement.
    let pool = ConnectionPool::new(PoolConfig::default(), MemoryStore::new())
        .await
        .unwrap();
    let engine = RecipeEngine::new(pool);

    assert!(matches!(
        engine.create(&toast()).await,
        Err(EngineError::Store(_))
    ));
    assert!(matches!(engine.list().await, Err(EngineError::Store(_))));

    // The failed operations handed their connection back.
    let stats = engine.pool().stats();
    assert_eq!(stats.active_connections, 0);
    assert_eq!(stats.idle_connections, stats.total_connections);
}
