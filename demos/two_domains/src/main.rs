//! two_domains — smallest end-to-end demo of the rust_nav planner.
//!
//! Two domains, `overworld` and `nether`, joined by a pair of doors loaded
//! from CSV.  The overworld has a wall between the spawn and the nearest
//! door, so the first itinerary found is later superseded by a cheaper
//! prospective one through the far door.  Several owners submit sessions at
//! once; the executor pump drives them fairly, one pass per tick.
//!
//! Run with `RUST_LOG=debug` to see trial and scheduler lifecycle events.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, bail};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nav_core::{Cell, ModeType, OwnerId};
use nav_schedule::{ManagerConfig, TickExecutor};
use nav_search::{
    AxisStepProvider, EventKind, EventKinds, EventSink, ModeProvider, SearchEvent, load_ports_reader,
};
use nav_session::{NavContext, SearchConfig, SessionHandle};

// ── Constants ─────────────────────────────────────────────────────────────────

const WORLD_RADIUS:    i32   = 24;
const SESSION_COUNT:   u64   = 6;
const OWNER_COUNT:     u64   = 3;
const WORKER_THREADS:  usize = 2;
const MAX_TICKS:       usize = 100_000;

// ── Port registry ─────────────────────────────────────────────────────────────

const PORTS_CSV: &str = "\
origin_domain,ox,oy,oz,dest_domain,dx,dy,dz,mode,cost\n\
overworld,8,0,0,nether,1,0,0,door,4.0\n\
overworld,0,0,12,nether,0,0,1,door,4.0\n\
nether,1,0,0,overworld,8,0,0,door,4.0\n\
";

// ── World ─────────────────────────────────────────────────────────────────────

/// Flat square floors; the overworld has a wall at x = 4 for |z| ≤ 9.
fn passable(cell: &Cell) -> bool {
    let inside = cell.x.abs() <= WORLD_RADIUS && cell.z.abs() <= WORLD_RADIUS;
    let wall = cell.domain.as_str() == "overworld" && cell.x == 4 && cell.z.abs() <= 9;
    inside && !wall
}

/// Prints every delivered itinerary as it is found.
struct SolutionPrinter;

impl EventSink for SolutionPrinter {
    fn emit(&self, event: &SearchEvent) {
        if let SearchEvent::FoundSolution { itinerary, prospective } = event {
            info!(
                cost = itinerary.total_cost(),
                crossings = itinerary.crossing_count(),
                prospective,
                "itinerary found"
            );
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // ── Context ───────────────────────────────────────────────────────────
    let executor = Arc::new(TickExecutor::new(WORKER_THREADS)?);
    let config = SearchConfig {
        slice_iterations: 64,
        manager: ManagerConfig { global_cap: 4, per_owner_cap: 2 },
        ..SearchConfig::default()
    };
    let ctx = NavContext::new(config, executor.clone())?;
    ctx.events().subscribe(EventKinds::of(&[EventKind::FoundSolution]), Arc::new(SolutionPrinter));
    let pump = ctx.start_pump(1, false)?;

    let ports = load_ports_reader(PORTS_CSV.as_bytes())?;
    let walk: Arc<dyn ModeProvider> = Arc::new(AxisStepProvider::new(ModeType::Walk, 1.0, passable));
    info!(ports = ports.len(), "loaded port registry");

    // ── Sessions ──────────────────────────────────────────────────────────
    let handles: Vec<SessionHandle> = (0..SESSION_COUNT)
        .map(|i| {
            ctx.session()
                .origin(Cell::new("overworld", 0, 0, i as i32))
                .destination(Cell::new("nether", 6, 0, 2 * i as i32))
                .owner(OwnerId(i % OWNER_COUNT))
                .provider(Arc::clone(&walk))
                .ports(ports.iter().cloned())
                .submit()
        })
        .collect::<Result<_, _>>()?;

    // ── Tick loop ─────────────────────────────────────────────────────────
    let started = Instant::now();
    let mut ticks = 0;
    while !handles.iter().all(SessionHandle::is_finished) {
        if ticks == MAX_TICKS {
            bail!("sessions still running after {MAX_TICKS} ticks");
        }
        executor.tick()?;
        ticks += 1;
    }
    ctx.stop_pump(pump)?;

    for handle in &handles {
        let cost = handle.itinerary().map(|i| i.total_cost());
        info!(
            session = %handle.id(),
            owner = %handle.owner(),
            status = %handle.status(),
            cost = ?cost,
            improved = handle.prospective().is_some(),
            "session result"
        );
    }
    let stats = ctx.manager().stats();
    info!(
        ticks,
        elapsed_ms = started.elapsed().as_millis() as u64,
        completed = stats.completed,
        deactivations = stats.deactivations,
        "all sessions finished"
    );
    Ok(())
}
