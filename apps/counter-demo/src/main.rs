use std::io::{self, BufRead, Write};
use std::sync::mpsc;
use std::time::Duration;

use fiber_app_shell::AppShell;
use fiber_core::{create_element, use_state, Attributes, Child, Component, Event, MemoryHost};

const SLICE_BUDGET: Duration = Duration::from_millis(16);
const MAX_SLICES_PER_INPUT: usize = 64;

fn counter_app() -> Component {
    Component::new("Counter", |_props| {
        let (count, set_count) = use_state(1i64)?;
        let increment = set_count.clone();
        let heading = create_element("h1", Attributes::new(), [format!("Count: {count}")]);
        let plus = create_element(
            "button",
            Attributes::new()
                .with("id", "increment")
                .on("onClick", move |_| increment.update(|count| count + 1)),
            ["+"],
        );
        let minus = create_element(
            "button",
            Attributes::new()
                .with("id", "decrement")
                .on("onClick", move |_| set_count.update(|count| count - 1)),
            ["-"],
        );
        let parity = (count % 2 == 0).then(|| create_element("em", Attributes::new(), ["Even"]));
        Ok(create_element(
            "div",
            Attributes::new(),
            vec![
                Child::from(heading),
                Child::from(plus),
                Child::from(minus),
                Child::from(parity),
            ],
        ))
    })
}

fn press(shell: &AppShell<MemoryHost>, id: &str) {
    let host = shell.host();
    let target = host
        .find_all(shell.container(), "button")
        .into_iter()
        .find(|node| host.property(*node, "id").map(ToString::to_string).as_deref() == Some(id));
    match target {
        Some(node) => {
            if let Err(err) = host.dispatch_event(node, "click", Event::new("click")) {
                log::error!("click on #{id} failed: {err}");
            }
        }
        None => log::warn!("no button #{id} on screen"),
    }
}

fn main() {
    env_logger::init();

    println!("=== Fiber Counter Example ===");
    println!("Commands: '+' increment, '-' decrement, 'd' dump tree, 'q' quit");
    println!();

    let app = counter_app();
    let mut shell = AppShell::headless(
        create_element(&app, Attributes::new(), Vec::<Child>::new()),
        SLICE_BUDGET,
    );

    let (wake_tx, wake_rx) = mpsc::channel();
    shell.set_idle_waker(move || {
        if wake_tx.send(()).is_err() {
            log::trace!("idle request after the input loop ended");
        }
    });

    let stdin = io::stdin();
    loop {
        let wakes = wake_rx.try_iter().count();
        if wakes > 0 || shell.should_render() {
            let slices = shell.run_until_idle(MAX_SLICES_PER_INPUT);
            log::debug!(
                "{wakes} idle requests, settled after {slices} slices, {} commits",
                shell.commits()
            );
        }
        let container = shell.container();
        println!("{}", shell.host().text_content(container));
        print!("> ");
        if let Err(err) = io::stdout().flush() {
            log::error!("failed to flush prompt: {err}");
        }

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(err) => {
                log::error!("failed to read input: {err}");
                break;
            }
        }
        match line.trim() {
            "+" => press(&shell, "increment"),
            "-" => press(&shell, "decrement"),
            "d" => shell.log_debug_info(),
            "q" => break,
            other => println!("unknown command {other:?}"),
        }
    }
    shell.clear_idle_waker();
}
