//! Main submarine-side executable entry point.
//!
//! # Architecture
//!
//! The executable runs four threads:
//!
//!     - Ingestion: the `BusClient` (or a bus script) parses inbound messages and sends them to
//!       the control thread over a channel. Parameter reloads are read from disk here.
//!     - Publication: the `TmServer` publishes the latest telemetry at the status period and any
//!       zero position requests as soon as they are raised.
//!     - Archive: writes the status archive and waypoint logs to disk.
//!     - Control (main thread), once per cycle:
//!         - Apply the messages received since the last cycle
//!         - Navigation control processing (mode dispatch, movement control, thrust allocation)
//!         - Queue archive records
//!         - Hand telemetry to the publication thread
//!
//! Threads share no state, everything crosses between them by bounded channel. The control
//! thread never blocks on a full channel, it drops the item instead.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info, warn};
use std::env;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};
use color_eyre::{Report, eyre::{WrapErr, eyre}};

// Internal
use comms_if::net::NetParams;
use sub_lib::{
    actuator,
    bus_client::BusClient,
    ingest::{self, Inbound, Ingest, InputState},
    nav_ctrl::NavCtrl,
    params::SubExecParams,
    tm_server::{self, Outbound, TmServer},
};
use util::{
    archive::{self, Archived},
    logger::{logger_init, LevelFilter},
    session::{self, Session},
    script_interpreter::{ScriptInterpreter, PendingMsgs},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Inbound items held for the control loop, also the most applied in one cycle.
const INBOUND_QUEUE_LEN: usize = 64;

/// Outbound items held for the TM server.
const OUTBOUND_QUEUE_LEN: usize = 16;

/// Commands held for the archive thread.
const ARCHIVE_QUEUE_LEN: usize = 256;

const MOVEMENT_PARAMS_FILE: &str = "movement_ctrl.toml";

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {

    // ---- EARLY INITIALISATION ----

    color_eyre::install()?;

    // Initialise session
    let session = Session::new(
        "sub_exec",
        "sessions"
    ).wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session)
        .wrap_err("Failed to initialise logging")?;

    info!("Submarine Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: SubExecParams = util::params::load("sub_exec.toml")
        .wrap_err("Could not load exec params")?;
    exec_params.validate()
        .wrap_err("Invalid exec params")?;

    let net_params: NetParams = util::params::load("net.toml")
        .wrap_err("Could not load net params")?;

    info!("Exec parameters loaded");

    // ---- INITIALISE BUS SOURCE ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // If we have a single argument use it as the script path
    let script = match args.len() {
        2 => {
            info!("Loading script from \"{}\"", &args[1]);

            let si = ScriptInterpreter::new(&args[1])
                .wrap_err("Failed to load script")?;

            info!(
                "Loaded script lasts {:.02} s and contains {} messages\n",
                si.get_duration(),
                si.get_num_msgs()
            );

            Some(si)
        },
        1 => {
            info!("No script provided, messages will be received from the bus\n");
            None
        },
        _ => return Err(eyre!(
            "Expected either zero or one argument, found {}", args.len() - 1
        ))
    };
    let from_script = script.is_some();

    // ---- INITIALISE MODULES ----

    info!("Initialising modules...");

    let actuator = actuator::build(&exec_params.actuator)
        .wrap_err("Failed to initialise the actuator")?;

    let (archive_tx, archive_handle) = archive::spawn_writer(ARCHIVE_QUEUE_LEN)
        .wrap_err("Failed to start the archive thread")?;

    let mut nav_ctrl = NavCtrl::init(
        "nav_ctrl.toml",
        MOVEMENT_PARAMS_FILE,
        actuator,
        archive_tx.clone()
    ).wrap_err("Failed to initialise NavCtrl")?;
    nav_ctrl.init_archive(&session)
        .wrap_err("Failed to initialise the NavCtrl archive")?;
    info!("NavCtrl init complete");

    info!("Module initialisation complete\n");

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let (in_tx, in_rx) = mpsc::sync_channel::<Inbound>(INBOUND_QUEUE_LEN);
    let (out_tx, out_rx) = mpsc::sync_channel::<Outbound>(OUTBOUND_QUEUE_LEN);
    let source = Ingest::new(in_tx, MOVEMENT_PARAMS_FILE);

    let tm_server = TmServer::new(&zmq_ctx, &net_params)
        .wrap_err("Failed to initialise TmServer")?;
    let status_period = Duration::from_secs_f64(exec_params.status_period_s);
    thread::Builder::new()
        .name("tm_server".into())
        .spawn(move || tm_server.run(out_rx, status_period))
        .wrap_err("Failed to start the TmServer thread")?;
    info!("TmServer initialised");

    let poll_period = Duration::from_secs_f64(exec_params.ingest_poll_period_s);
    match script {
        Some(si) => {
            thread::Builder::new()
                .name("bus_script".into())
                .spawn(move || run_script(si, source, poll_period))
                .wrap_err("Failed to start the bus script thread")?;
            info!("Bus script started");
        },
        None => {
            let client = BusClient::new(
                &zmq_ctx,
                &net_params,
                exec_params.ingest_poll_timeout_ms()
            ).wrap_err("Failed to initialise BusClient")?;
            thread::Builder::new()
                .name("bus_client".into())
                .spawn(move || client.run(source))
                .wrap_err("Failed to start the BusClient thread")?;
            info!("BusClient initialised");
        }
    }

    info!("Network initialisation complete");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);
    let mut num_consec_cycle_overruns: u64 = 0;

    let exit: Result<(), Report> = loop {

        // Get cycle start time
        let cycle_start_instant = Instant::now();
        let time_s = session::get_elapsed_seconds();

        // ---- MESSAGE PROCESSING ----

        let input = ingest::drain(&in_rx, &mut nav_ctrl, &out_tx, time_s, INBOUND_QUEUE_LEN);

        if input == InputState::Ended {
            if from_script {
                info!("End of bus script reached, stopping");
                break Ok(())
            }

            break Err(eyre!("The BusClient thread has stopped"))
        }

        // ---- CONTROL ALGORITHM PROCESSING ----

        nav_ctrl.tick(time_s);

        // ---- WRITE ARCHIVES ----

        if let Err(e) = nav_ctrl.write() {
            warn!("Could not write the NavCtrl archive: {}", e);
        }

        // ---- TELEMETRY ----

        tm_server::queue(
            &out_tx,
            Outbound::Telemetry(nav_ctrl.tm(time_s, num_consec_cycle_overruns))
        );

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        // Get sleep duration
        match cycle_period.checked_sub(cycle_dur) {
            Some(d) => {
                num_consec_cycle_overruns = 0;
                thread::sleep(d);
            },
            None => {
                warn!(
                    "Cycle overran by {:.06} s",
                    cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                );
                num_consec_cycle_overruns += 1;
            }
        }
    };

    // ---- SHUTDOWN ----

    // Both exit paths leave the thrusters stopped
    nav_ctrl.shutdown();
    info!("Thrusters stopped");

    // The archive thread exits once the queue is written out and every sender is gone
    drop(nav_ctrl);
    drop(archive_tx);
    if archive_handle.join().is_err() {
        warn!("The archive thread panicked");
    }

    info!("End of execution");

    exit
}

/// Release the messages of a bus script to the control loop as they fall due.
///
/// Returns at the end of the script, dropping `ingest` so the control loop knows there is no more
/// input.
fn run_script(mut si: ScriptInterpreter, ingest: Ingest, poll_period: Duration) {
    loop {
        match si.get_pending_msgs() {
            PendingMsgs::None => thread::sleep(poll_period),
            PendingMsgs::Some(msgs) => {
                for msg in msgs {
                    if ingest.forward(msg).is_err() {
                        return
                    }
                }
            },
            PendingMsgs::EndOfScript => return
        }
    }
}
