use std::collections::VecDeque;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use coursebin_client::{JobClient, ReqwestApi, SchedulerApi, SectionRefresher};
use coursebin_core::{update, AppState, Msg, NoticeLevel};
use coursebin_logging::{cb_debug, cb_info};
use log::LevelFilter;

use crate::cli::{Cli, Command};
use crate::config::AppConfig;
use crate::effects::EffectRunner;
use crate::persistence::{load_snapshot, save_snapshot};
use crate::render;

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = AppConfig::load(cli.config.as_deref(), &cli.state_dir)?;
    if let Some(api_url) = cli.api_url.clone() {
        config.api.base_url = api_url;
    }
    let level = match cli.verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    coursebin_logging::initialize(config.log_destination(), level);

    let api: Arc<dyn SchedulerApi> = Arc::new(
        ReqwestApi::new(config.api_settings()).context("configuring the scheduler API")?,
    );
    let runner = EffectRunner::new(
        Arc::clone(&api),
        JobClient::new(Arc::clone(&api), config.poll_schedule()),
        SectionRefresher::new(api, config.section_lifetime()),
    )?;

    if let Command::CheckSections { schedule_id } = cli.command {
        let (sections, report) = runner.check_sections(schedule_id, Utc::now())?;
        print!("{}", render::render_refresh(&sections, &report));
        return Ok(());
    }

    let show_bin = matches!(cli.command, Command::List);
    let msgs = cli
        .command
        .into_msgs(Utc::now(), config.section_lifetime());

    let mut state = AppState::from_snapshot(load_snapshot(&cli.state_dir));
    state = dispatch(state, msgs, &runner);
    // The command's view ends here; stop anything still in flight.
    state = dispatch(state, vec![Msg::ViewClosed], &runner);

    let mut failed = false;
    for notice in state.take_notices() {
        failed |= notice.level == NoticeLevel::Error;
        eprintln!("{}", render::render_notice(&notice));
    }
    let view = state.view();
    if show_bin {
        print!("{}", render::render_bin(&view));
    }
    if let Some(job) = &view.job {
        println!("{}", render::render_job(job));
    }

    if state.consume_dirty() {
        save_snapshot(&cli.state_dir, &state.snapshot())?;
    }
    if failed {
        anyhow::bail!("command finished with errors");
    }
    Ok(())
}

/// Feeds `msgs` through `update`, executing effects until none remain.
fn dispatch(mut state: AppState, msgs: Vec<Msg>, runner: &EffectRunner) -> AppState {
    let mut inbox: VecDeque<Msg> = msgs.into();
    while !inbox.is_empty() {
        let mut effects = Vec::new();
        while let Some(msg) = inbox.pop_front() {
            cb_debug!("Dispatching {:?}", msg);
            let (next, new_effects) = update(state, msg);
            state = next;
            effects.extend(new_effects);
        }
        if !effects.is_empty() {
            cb_info!("Running {} effects", effects.len());
            inbox.extend(runner.run(effects));
        }
    }
    state
}
