//! Tests for lazy step trees over a shared strategy

use bbstree::application::managers::{StepRoot, StepTreeManager};
use bbstree::domain::{
    DomainError, LazyTree, NodeId, Population, SharedStrategy, StepAnchor, StepTemplate, Strategy,
};
use bbstree::util::testing;

#[ctor::ctor]
fn init() {
    testing::init_test_setup();
}

fn shared() -> SharedStrategy {
    Strategy::from_templates(&[
        StepTemplate::new("Beam").with_child(
            StepTemplate::new("Calibrate")
                .with_operation("CAL")
                .with_attribute("Model", "3C196"),
        ),
        StepTemplate::new("Image").with_operation("IMG"),
    ])
    .share()
}

fn whole(title: &str) -> StepRoot {
    StepRoot {
        title: title.to_string(),
        anchor: StepAnchor::Strategy,
    }
}

fn labels<I: IntoIterator<Item = NodeId>>(
    tree: &LazyTree<StepTreeManager>,
    ids: I,
) -> Vec<String> {
    ids.into_iter().map(|id| tree.label(id).unwrap()).collect()
}

#[test]
fn given_strategy_root_when_listing_children_then_root_steps_with_operations() {
    let mut tree = LazyTree::new(StepTreeManager::new(shared()));
    let root = tree.open_root(whole("plan")).unwrap();

    let children = tree.children(root).unwrap();

    assert_eq!(tree.label(root).unwrap(), "plan");
    assert_eq!(labels(&tree, children), ["Beam", "Image (IMG)"]);
}

#[test]
fn given_leaf_step_when_asking_is_leaf_then_no_population_needed() {
    let mut tree = LazyTree::new(StepTreeManager::new(shared()));
    let root = tree.open_root(whole("plan")).unwrap();
    let image = tree.child_at(root, 1).unwrap().unwrap();

    assert!(tree.is_leaf(image).unwrap());
    assert_eq!(tree.node(image).unwrap().state(), &Population::Pending);
}

#[test]
fn given_populated_node_when_strategy_grows_then_node_keeps_first_snapshot() {
    // Arrange
    let strategy = shared();
    let mut tree = LazyTree::new(StepTreeManager::new(strategy.clone()));
    let root = tree.open_root(whole("plan")).unwrap();
    assert_eq!(tree.child_count(root).unwrap(), 2);

    // Act
    strategy
        .write()
        .unwrap()
        .cascading_step_insertion(None, &StepTemplate::new("Export"));

    // Assert
    assert_eq!(tree.child_count(root).unwrap(), 2);
    let root = tree.open_root(whole("plan")).unwrap();
    assert_eq!(tree.child_count(root).unwrap(), 3);
}

#[test]
fn given_pending_step_deleted_when_populating_then_node_broken() {
    // Arrange
    let strategy = shared();
    let mut tree = LazyTree::new(StepTreeManager::new(strategy.clone()));
    let root = tree.open_root(whole("plan")).unwrap();
    let beam = tree.child_at(root, 0).unwrap().unwrap();

    strategy
        .write()
        .unwrap()
        .cascading_step_deletion(None, "Beam", 0);

    // Act
    let first = tree.child_count(beam);
    let second = tree.child_count(beam);

    // Assert
    assert!(matches!(first, Err(DomainError::Fetch { .. })));
    assert_eq!(second.unwrap(), 0);
    assert!(matches!(
        tree.node(beam).unwrap().state(),
        Population::Broken(_)
    ));
}

#[test]
fn given_step_anchor_when_opening_then_root_titled_and_children_are_steps() {
    let strategy = shared();
    let beam = strategy.read().unwrap().find_by_name("Beam")[0];
    let mut tree = LazyTree::new(StepTreeManager::new(strategy));

    let root = tree
        .open_root(StepRoot {
            title: "Beam".to_string(),
            anchor: StepAnchor::Step(beam),
        })
        .unwrap();
    let children = tree.children(root).unwrap();

    assert_eq!(tree.label(root).unwrap(), "Beam");
    assert_eq!(labels(&tree, children), ["Calibrate (CAL)"]);
}

#[test]
fn given_deleted_anchor_when_opening_then_root_error() {
    let strategy = shared();
    let image = strategy.read().unwrap().find_by_name("Image")[0];
    strategy
        .write()
        .unwrap()
        .cascading_step_deletion(None, "Image", 1);
    let mut tree = LazyTree::new(StepTreeManager::new(strategy));

    let result = tree.open_root(StepRoot {
        title: "Image".to_string(),
        anchor: StepAnchor::Step(image),
    });

    assert!(matches!(result, Err(DomainError::Root(_))));
}
