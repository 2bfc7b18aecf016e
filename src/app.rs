use crate::audio::{AudioEngine, NullAudioEngine, RodioAudioEngine};
use crate::config;
use crate::core::LmpCore;
use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use std::io::stdout;
use std::path::Path;
use std::time::{Duration, Instant};

const HELP_TEXT: &str = "add addfolder rename remove search play pause stop next volume \
setmode listnew deletelist listadd listremove listaddmulti listview listplay library help quit";

pub fn run() -> Result<()> {
    let state = config::load_state()?;
    let mut core = LmpCore::from_persisted(state);

    let mut audio: Box<dyn AudioEngine> = match RodioAudioEngine::new() {
        Ok(engine) => Box::new(engine),
        Err(_) => Box::new(NullAudioEngine::new()),
    };
    audio.set_volume(core.volume);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut command_mode = false;
    let mut command_buffer = String::new();
    let mut last_draw = Instant::now();

    let result: Result<()> = loop {
        core.tick(&mut *audio);

        if core.dirty || last_draw.elapsed() >= Duration::from_millis(250) {
            let command = command_mode.then_some(command_buffer.as_str());
            terminal.draw(|frame| crate::ui::draw(frame, &core, &*audio, command))?;
            core.dirty = false;
            last_draw = Instant::now();
        }

        if !event::poll(Duration::from_millis(100))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            break Ok(());
        }

        if command_mode {
            match key.code {
                KeyCode::Enter => {
                    command_mode = false;
                    let raw = std::mem::take(&mut command_buffer);
                    let keep_running = run_command(&mut core, &mut *audio, &raw);
                    if let Err(err) = core.save() {
                        core.set_status(&format!("Warning: failed to save state: {err:#}"));
                    }
                    if !keep_running {
                        break Ok(());
                    }
                }
                KeyCode::Esc => {
                    command_mode = false;
                    command_buffer.clear();
                    core.dirty = true;
                }
                KeyCode::Backspace => {
                    command_buffer.pop();
                    core.dirty = true;
                }
                KeyCode::Char(ch) => {
                    command_buffer.push(ch);
                    core.dirty = true;
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char(':') => {
                command_mode = true;
                command_buffer.clear();
                core.dirty = true;
            }
            KeyCode::Char('q') => break Ok(()),
            KeyCode::Char(' ') => core.pause_toggle(&mut *audio),
            KeyCode::Char('n') => core.skip(&mut *audio),
            _ => {}
        }
    };

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    let save_result = core.save();
    result?;
    save_result
}

/// Splits a command line on whitespace, keeping double-quoted segments
/// as single arguments. Quotes do not nest; an unterminated quote runs
/// to the end of the line.
fn tokenize(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;

    for ch in raw.chars() {
        match ch {
            '"' => {
                if in_quotes {
                    tokens.push(std::mem::take(&mut current));
                }
                in_quotes = !in_quotes;
            }
            ch if ch.is_whitespace() && !in_quotes => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            ch => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

/// Executes one command line. Returns false when the app should exit.
pub fn run_command(core: &mut LmpCore, audio: &mut dyn AudioEngine, raw: &str) -> bool {
    let tokens = tokenize(raw);
    let Some(command) = tokens.first().map(String::as_str) else {
        return true;
    };
    let args = &tokens[1..];

    match command {
        "add" => match args {
            [name, path] => {
                let path = Path::new(path);
                if path.exists() {
                    core.add_track(name, path);
                } else {
                    core.set_status(&format!("Error: File not found: {}", path.display()));
                }
            }
            _ => core.set_status("Usage: add \"Track Name\" /path/to/file.mp3"),
        },
        "addfolder" => match args {
            [dir] => core.add_folder(Path::new(dir)),
            _ => core.set_status("Usage: addfolder /path/to/folder"),
        },
        "rename" => match args {
            [index, new_name] => match index.parse::<usize>() {
                Ok(id) if id >= 1 && id <= core.library.len() => {
                    let current = core
                        .library
                        .get(id - 1)
                        .map(|track| track.name.clone());
                    if let Some(current) = current {
                        core.rename_track(&current, new_name);
                    }
                }
                _ => core.set_status(&format!(
                    "Error: invalid index. Must be 1-{}",
                    core.library.len()
                )),
            },
            _ => core.set_status("Usage: rename <track id> \"New Name\""),
        },
        "remove" | "rm" => match args {
            [name] => core.remove_track(audio, name),
            _ => core.set_status("Usage: remove \"Track Name\""),
        },
        "search" => match args {
            [term] => {
                core.search(term);
            }
            _ => core.set_status("Usage: search <term>"),
        },
        "play" => match args {
            [name] => core.play(audio, name),
            _ => core.set_status("Usage: play \"Track Name\""),
        },
        "pause" => core.pause_toggle(audio),
        "stop" => core.stop(audio),
        "next" => core.skip(audio),
        "volume" | "setvolume" => match args {
            [value] => match value.parse::<usize>() {
                Ok(volume) => core.set_volume(audio, volume),
                Err(_) => core.set_status("Error: Volume must be between 0 and 100."),
            },
            _ => core.set_status("Usage: volume <0-100>"),
        },
        "setmode" | "mode" => match args {
            [mode] => core.set_mode(mode),
            _ => core.set_status("Usage: setmode no-repeat|repeat-one|repeat-all|shuffle"),
        },
        "listnew" | "createlist" => match args {
            [name] => core.create_playlist(name),
            _ => core.set_status("Usage: listnew \"Playlist Name\""),
        },
        "deletelist" => match args {
            [name] => core.delete_playlist(audio, name),
            _ => core.set_status("Usage: deletelist \"Playlist Name\""),
        },
        "listadd" => match args {
            [playlist, track] => core.playlist_add(playlist, track),
            _ => core.set_status("Usage: listadd \"Playlist\" \"Track Name\""),
        },
        "listremove" => match args {
            [playlist, position] => match position.parse::<usize>() {
                Ok(position) => core.playlist_remove_entry(audio, playlist, position),
                Err(_) => core.set_status("Usage: listremove \"Playlist\" <position>"),
            },
            _ => core.set_status("Usage: listremove \"Playlist\" <position>"),
        },
        "listaddmulti" => match args {
            [playlist, ids @ ..] if !ids.is_empty() => {
                let ids: Vec<usize> = ids
                    .iter()
                    .filter_map(|token| token.parse::<usize>().ok())
                    .collect();
                core.playlist_add_multi(playlist, &ids);
            }
            _ => core.set_status("Usage: listaddmulti \"Playlist\" <id> <id> ..."),
        },
        "listview" => match args {
            [name] => view_playlist(core, name),
            _ => core.set_status("Usage: listview \"Playlist Name\""),
        },
        "listplay" => match args {
            [name] => core.play_playlist(audio, name),
            _ => core.set_status("Usage: listplay \"Playlist Name\""),
        },
        "library" | "lib" => {
            core.set_status(&format!("Library: {} tracks.", core.library.len()));
        }
        "help" => core.set_status(HELP_TEXT),
        "quit" | "q" | "exit" => return false,
        other => core.set_status(&format!("Unknown command: {other}")),
    }
    true
}

fn view_playlist(core: &mut LmpCore, name: &str) {
    let Some(index) = core.playlists.find_by_name(name) else {
        core.set_status(&format!("Error: Playlist '{name}' not found."));
        return;
    };
    let Some(playlist) = core.playlists.get(index) else {
        return;
    };
    if playlist.is_empty() {
        core.set_status(&format!("Playlist '{name}' is empty."));
        return;
    }

    let names: Vec<&str> = playlist
        .entries()
        .iter()
        .filter_map(|&entry| core.library.get(entry))
        .map(|track| track.name.as_str())
        .collect();
    let listing = names.join(", ");
    core.set_status(&format!("Playlist '{name}': {listing}"));
}
