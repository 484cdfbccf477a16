use super::*;
use crate::element::{create_element, create_text_element, Child, Component, Event, PropValue};
use crate::fiber::EffectTag;
use crate::hooks::{use_state, SetState};
use crate::memory_host::{HostOp, HostShape, MemoryHost};
use crate::platform::UnitBudget;
use crate::platform::IdleScheduler;
use std::cell::RefCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Default)]
struct CountingScheduler {
    requests: AtomicUsize,
}

impl CountingScheduler {
    fn take(&self) -> usize {
        self.requests.swap(0, Ordering::SeqCst)
    }
}

impl IdleScheduler for CountingScheduler {
    fn request_idle_callback(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

fn mount(element: Element) -> (Renderer<MemoryHost>, NodeId) {
    let mut host = MemoryHost::new();
    let container = host.create_container("root");
    let mut renderer = Renderer::new(host);
    renderer.render(element, container);
    renderer.flush_sync().expect("initial render");
    (renderer, container)
}

fn mount_counting(element: Element) -> (Renderer<MemoryHost>, NodeId, Arc<CountingScheduler>) {
    let scheduler = Arc::new(CountingScheduler::default());
    let mut host = MemoryHost::new();
    let container = host.create_container("root");
    let mut renderer = Renderer::with_runtime(host, Runtime::new(scheduler.clone()));
    renderer.render(element, container);
    renderer.flush_sync().expect("initial render");
    scheduler.take();
    (renderer, container, scheduler)
}

fn leaf(tag: &str) -> Element {
    create_element(tag, Attributes::new(), Vec::<Child>::new())
}

fn list(tags: &[&str]) -> Element {
    create_element("ul", Attributes::new(), tags.iter().map(|tag| leaf(tag)))
}

fn page() -> Element {
    create_element(
        "div",
        Attributes::new().with("id", "app"),
        vec![
            Child::from(create_element("h1", Attributes::new(), ["Title"])),
            Child::from("body"),
        ],
    )
}

fn committed_effects(renderer: &Renderer<MemoryHost>) -> Vec<EffectTag> {
    let fibers = renderer.fibers();
    let root = renderer.current_root().expect("committed root");
    fibers
        .preorder(root)
        .into_iter()
        .skip(1)
        .map(|id| fibers[id].effect())
        .collect()
}

fn element(tag: &str, children: Vec<HostShape>) -> HostShape {
    HostShape::Element {
        tag: tag.to_owned(),
        children,
    }
}

fn counter() -> Component {
    Component::new("Counter", |_props| {
        let (count, set_count) = use_state(1i64)?;
        let heading = create_element(
            "h1",
            Attributes::new().on("onClick", move |_| set_count.update(|count| count + 1)),
            [format!("Count: {count}")],
        );
        let badge = (count % 2 == 0).then(|| create_element("span", Attributes::new(), ["Even"]));
        Ok(create_element(
            "div",
            Attributes::new(),
            vec![Child::from(heading), Child::from(badge)],
        ))
    })
}

fn click(renderer: &Renderer<MemoryHost>, container: NodeId) {
    let host = renderer.host();
    let heading = host.find(container, "h1").expect("heading");
    let ran = host
        .dispatch_event(heading, "click", Event::new("click"))
        .expect("dispatch");
    assert_eq!(ran, 1);
}

#[test]
fn first_commit_mirrors_element_tree() {
    let (renderer, container) = mount(page());

    assert_eq!(
        renderer.host().shape(container),
        Some(element(
            "root",
            vec![element(
                "div",
                vec![
                    element("h1", vec![HostShape::Text("Title".into())]),
                    HostShape::Text("body".into()),
                ]
            )]
        ))
    );
    assert_eq!(
        renderer.last_commit(),
        Some(CommitSummary {
            placements: 4,
            updates: 0,
            deletions: 0
        })
    );
    assert!(renderer.work_in_progress_root().is_none());
}

#[test]
fn rerendering_identical_tree_changes_nothing() {
    let (mut renderer, container) = mount(page());
    renderer.host_mut().take_ops();

    renderer.render(page(), container);
    renderer.flush_sync().expect("second render");

    assert!(committed_effects(&renderer)
        .iter()
        .all(|effect| *effect == EffectTag::None));
    assert_eq!(renderer.last_commit(), Some(CommitSummary::default()));
    assert!(renderer.host().ops().is_empty());
}

#[test]
fn replacing_middle_child_keeps_neighbours() {
    let (mut renderer, container) = mount(list(&["a", "b", "c"]));
    let ul = renderer.host().children(container)[0];
    let before = renderer.host().children(ul).to_vec();

    renderer.render(list(&["a", "x", "c"]), container);
    renderer.flush_sync().expect("re-render");

    assert_eq!(
        renderer.last_commit(),
        Some(CommitSummary {
            placements: 1,
            updates: 0,
            deletions: 1
        })
    );
    let fibers = renderer.fibers();
    let root = renderer.current_root().expect("root");
    let ul_fiber = fibers[root].child().expect("ul fiber");
    let order: Vec<&str> = fibers
        .children(ul_fiber)
        .filter_map(|id| fibers[id].element_type().map(|ty| ty.name()))
        .collect();
    assert_eq!(order, ["a", "x", "c"]);

    let after = renderer.host().children(ul).to_vec();
    assert_eq!(after[0], before[0]);
    assert_eq!(after[2], before[2]);
    assert!(!before.contains(&after[1]));
    assert_eq!(renderer.host().node(after[1]).map(|node| node.tag()), Some("x"));
}

#[test]
fn placed_node_lands_before_kept_sibling() {
    let (mut renderer, container) = mount(create_element(
        "div",
        Attributes::new(),
        vec![
            Child::from(create_element("p", Attributes::new(), Vec::<Child>::new())),
            Child::from("x"),
        ],
    ));

    renderer.render(
        create_element("div", Attributes::new(), ["y", "x"]),
        container,
    );
    renderer.flush_sync().expect("re-render");

    let div = renderer.host().children(container)[0];
    assert_eq!(
        renderer.host().shape(div),
        Some(HostShape::Element {
            tag: "div".into(),
            children: vec![HostShape::Text("y".into()), HostShape::Text("x".into())],
        })
    );
}

#[test]
fn placement_inside_component_keeps_document_order() {
    let badge = Component::new("Badge", |props| match props.get("wide") {
        Some(PropValue::Bool(true)) => Ok(create_element("b", Attributes::new(), ["wide"])),
        _ => Ok(create_element("i", Attributes::new(), ["narrow"])),
    });
    let page = |wide: bool| {
        create_element(
            "main",
            Attributes::new(),
            vec![
                Child::from(create_element("h2", Attributes::new(), ["head"])),
                Child::from(create_element(
                    &badge,
                    Attributes::new().with("wide", wide),
                    Vec::<Child>::new(),
                )),
                Child::from(create_element("footer", Attributes::new(), ["foot"])),
            ],
        )
    };
    let (mut renderer, container) = mount(page(false));

    renderer.render(page(true), container);
    renderer.flush_sync().expect("re-render");

    let main = renderer.host().children(container)[0];
    let tags: Vec<&str> = renderer
        .host()
        .children(main)
        .iter()
        .filter_map(|node| renderer.host().node(*node).map(|node| node.tag()))
        .collect();
    assert_eq!(tags, ["h2", "b", "footer"]);
    assert_eq!(renderer.host().text_content(container), "headwidefoot");
}

#[test]
fn nan_attribute_rerenders_without_effects() {
    let gauge = || {
        create_element(
            "meter",
            Attributes::new().with("value", f64::NAN),
            Vec::<Child>::new(),
        )
    };
    let (mut renderer, container) = mount(gauge());
    renderer.host_mut().take_ops();

    renderer.render(gauge(), container);
    renderer.flush_sync().expect("re-render");

    assert!(committed_effects(&renderer).iter().all(|tag| *tag == EffectTag::None));
    assert!(renderer.host().ops().is_empty());
}

#[test]
fn changed_attributes_are_patched_in_place() {
    let titled = |id: &str, title: Option<&str>| {
        let mut attributes = Attributes::new().with("id", id);
        if let Some(title) = title {
            attributes.insert("title", title);
        }
        create_element("div", attributes, Vec::<Child>::new())
    };
    let (mut renderer, container) = mount(titled("a", Some("hello")));
    let node = renderer.host().children(container)[0];
    renderer.host_mut().take_ops();

    renderer.render(titled("b", None), container);
    renderer.flush_sync().expect("re-render");

    assert_eq!(
        renderer.host().ops(),
        &[
            HostOp::RemoveProperty {
                node,
                name: "title".into()
            },
            HostOp::SetProperty {
                node,
                name: "id".into()
            },
        ]
    );
    assert_eq!(
        renderer.host().property(node, "id"),
        Some(&PropValue::from("b"))
    );
    assert_eq!(committed_effects(&renderer), vec![EffectTag::Update]);
}

#[test]
fn sliced_render_matches_uninterrupted_render() {
    let wide = || {
        create_element(
            "section",
            Attributes::new(),
            (0..20).map(|index| {
                create_element("p", Attributes::new().with("data-index", index), [index])
            }),
        )
    };
    let (reference, reference_container) = mount(wide());

    let mut host = MemoryHost::new();
    let container = host.create_container("root");
    let mut sliced = Renderer::new(host);
    sliced.render(wide(), container);

    let mut slices = 0;
    loop {
        let status = sliced.work_loop(&UnitBudget::new(3)).expect("slice");
        slices += 1;
        if status == WorkStatus::Committed {
            break;
        }
        assert_eq!(status, WorkStatus::Yielded);
        assert!(
            sliced.host().ops().iter().all(|op| !op.is_structural()),
            "nothing may attach before commit"
        );
    }

    assert!(slices > 1);
    assert_eq!(
        sliced.host().shape(container),
        reference.host().shape(reference_container)
    );
    assert_eq!(
        sliced.work_loop(&UnitBudget::new(3)),
        Ok(WorkStatus::Idle)
    );
}

#[test]
fn work_loop_always_rearms_idle_callback() {
    let (mut renderer, _, scheduler) = mount_counting(page());

    assert_eq!(renderer.work_loop(&Unbounded), Ok(WorkStatus::Idle));
    assert_eq!(scheduler.take(), 1);
}

#[test]
fn counter_increments_and_toggles_conditional_child() {
    let app = counter();
    let (mut renderer, container) = mount(create_element(
        &app,
        Attributes::new(),
        Vec::<Child>::new(),
    ));
    let heading = renderer.host().find(container, "h1").expect("heading");
    assert_eq!(renderer.host().text_content(heading), "Count: 1");
    assert!(renderer.host().find(container, "span").is_none());

    click(&renderer, container);
    assert!(renderer.has_pending_work());
    renderer.flush_sync().expect("after first click");

    assert_eq!(renderer.host().find(container, "h1"), Some(heading));
    assert_eq!(renderer.host().text_content(heading), "Count: 2");
    let badge = renderer.host().find(container, "span").expect("even badge");
    assert_eq!(renderer.host().text_content(badge), "Even");

    click(&renderer, container);
    renderer.flush_sync().expect("after second click");

    assert_eq!(renderer.host().text_content(heading), "Count: 3");
    assert!(renderer.host().find(container, "span").is_none());
    assert_eq!(renderer.last_commit().map(|summary| summary.deletions), Some(1));
}

#[test]
fn hook_slots_survive_unrelated_updates() {
    let setter: Rc<RefCell<Option<SetState<u32>>>> = Rc::default();
    let captured = Rc::clone(&setter);
    let profile = Component::new("Profile", move |_props| {
        let (name, _) = use_state(String::from("Ada"))?;
        let (visits, set_visits) = use_state(0u32)?;
        *captured.borrow_mut() = Some(set_visits);
        Ok(create_element("p", Attributes::new(), [format!("{name}:{visits}")]))
    });
    let (mut renderer, container) = mount(create_element(
        &profile,
        Attributes::new(),
        Vec::<Child>::new(),
    ));

    for _ in 0..3 {
        let set_visits = setter.borrow().clone().expect("setter");
        set_visits.update(|visits| visits + 1);
        renderer.flush_sync().expect("re-render");
    }

    assert_eq!(renderer.host().text_content(container), "Ada:3");
    let root = renderer.current_root().expect("root");
    let component = renderer.fibers()[root].child().expect("component fiber");
    assert_eq!(renderer.fibers()[component].hook_count(), 2);
}

#[test]
fn state_change_mid_pass_restarts_from_committed_root() {
    let app = counter();
    let (mut renderer, container) = mount(create_element(
        &app,
        Attributes::new(),
        Vec::<Child>::new(),
    ));
    let settled = renderer.fibers().len();

    click(&renderer, container);
    assert_eq!(
        renderer.work_loop(&UnitBudget::new(2)),
        Ok(WorkStatus::Yielded)
    );
    // The committed listener fires again while the pass is in flight.
    click(&renderer, container);
    renderer.flush_sync().expect("restarted render");

    let heading = renderer.host().find(container, "h1").expect("heading");
    assert_eq!(renderer.host().text_content(heading), "Count: 3");
    assert!(renderer.host().find(container, "span").is_none());
    assert_eq!(renderer.fibers().len(), settled);
}

#[test]
fn state_change_before_first_commit_waits_for_it() {
    let setter: Rc<RefCell<Option<SetState<&'static str>>>> = Rc::default();
    let captured = Rc::clone(&setter);
    let greeting = Component::new("Greeting", move |_props| {
        let (word, set_word) = use_state("hello")?;
        *captured.borrow_mut() = Some(set_word);
        Ok(create_text_element(word))
    });
    let mut host = MemoryHost::new();
    let container = host.create_container("root");
    let mut renderer = Renderer::new(host);
    renderer.render(
        create_element(&greeting, Attributes::new(), Vec::<Child>::new()),
        container,
    );

    assert_eq!(
        renderer.work_loop(&UnitBudget::new(2)),
        Ok(WorkStatus::Yielded)
    );
    setter.borrow().clone().expect("setter").set("bye");
    assert_eq!(renderer.work_loop(&Unbounded), Ok(WorkStatus::Committed));
    assert_eq!(renderer.host().text_content(container), "hello");

    assert!(renderer.has_pending_work());
    renderer.flush_sync().expect("held re-render");
    assert_eq!(renderer.host().text_content(container), "bye");
}

#[test]
fn explicit_render_after_state_change_wins() {
    let setter: Rc<RefCell<Option<SetState<i32>>>> = Rc::default();
    let captured = Rc::clone(&setter);
    let counter = Component::new("Counter", move |_props| {
        let (count, set_count) = use_state(0)?;
        *captured.borrow_mut() = Some(set_count);
        Ok(create_element("h1", Attributes::new(), [count]))
    });
    let view = || create_element(&counter, Attributes::new(), Vec::<Child>::new());
    let (mut renderer, container) = mount(view());

    setter.borrow().clone().expect("setter").set(5);
    renderer.render(view(), container);
    renderer.flush_sync().expect("re-render with queued update");
    assert_eq!(renderer.host().text_content(container), "5");

    setter.borrow().clone().expect("setter").set(9);
    renderer.render(create_element("p", Attributes::new(), ["replaced"]), container);
    renderer.flush_sync().expect("replacement");

    assert_eq!(renderer.host().text_content(container), "replaced");
    let p = renderer.host().children(container)[0];
    assert_eq!(renderer.host().node(p).map(|node| node.tag()), Some("p"));
    assert!(!renderer.has_pending_work());
}

#[test]
fn deleting_component_removes_its_host_node() {
    let badge = Component::new("Badge", |props| {
        let label = props.text("label").unwrap_or_default();
        Ok(create_element("em", Attributes::new(), [label]))
    });
    let view = |show: bool| {
        let child = show.then(|| {
            create_element(
                &badge,
                Attributes::new().with("label", "new"),
                Vec::<Child>::new(),
            )
        });
        create_element("div", Attributes::new(), [child])
    };
    let (mut renderer, container) = mount(view(true));
    let div = renderer.host().children(container)[0];
    assert_eq!(renderer.host().text_content(div), "new");

    renderer.render(view(false), container);
    renderer.flush_sync().expect("re-render");

    assert!(renderer.host().children(div).is_empty());
    assert_eq!(
        renderer.last_commit(),
        Some(CommitSummary {
            placements: 0,
            updates: 0,
            deletions: 1
        })
    );
}

#[test]
fn failing_component_aborts_the_pass() {
    let broken = Component::new("Broken", |_props| {
        Err(RenderError::component("Broken", "no data"))
    });
    let (mut renderer, container, scheduler) = mount_counting(page());
    let committed = renderer.current_root();
    let shape = renderer.host().shape(container);

    let failing = create_element(&broken, Attributes::new(), Vec::<Child>::new());
    renderer.render(
        create_element("div", Attributes::new(), [failing]),
        container,
    );
    let err = renderer.flush_sync().unwrap_err();

    assert_eq!(err, RenderError::component("Broken", "no data"));
    assert!(!renderer.has_pending_work());
    assert_eq!(renderer.current_root(), committed);
    assert_eq!(renderer.host().shape(container), shape);
    assert!(scheduler.take() > 0);
}

#[test]
fn new_render_replaces_pass_in_flight() {
    let (mut renderer, container) = mount(list(&["a"]));
    renderer.render(list(&["a", "b", "c"]), container);
    assert_eq!(
        renderer.work_loop(&UnitBudget::new(1)),
        Ok(WorkStatus::Yielded)
    );

    renderer.render(list(&["z"]), container);
    renderer.flush_sync().expect("replacement render");

    let ul = renderer.host().children(container)[0];
    assert_eq!(
        renderer.host().shape(ul),
        Some(element("ul", vec![element("z", Vec::new())]))
    );
    assert_eq!(renderer.fibers().len(), 3);
}

#[test]
fn arena_stays_bounded_across_renders() {
    let (mut renderer, container) = mount(list(&["a", "b"]));
    let baseline = renderer.fibers().len();
    assert_eq!(baseline, 4);

    for round in 0..10 {
        let tags: &[&str] = if round % 2 == 0 { &["a"] } else { &["a", "b"] };
        renderer.render(list(tags), container);
        renderer.flush_sync().expect("render");
    }

    assert_eq!(renderer.fibers().len(), baseline);
    assert!(renderer.pending_deletions().is_empty());
}
