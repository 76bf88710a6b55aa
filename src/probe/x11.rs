use std::fs;

use anyhow::Result;
use tracing::instrument;
use xcb::{
    x::{Atom, GetProperty, InternAtom, Window, ATOM_ANY},
    Connection, Xid,
};

use super::{FocusProbe, FocusSnapshot};

fn intern_atom(conn: &Connection, name: &[u8]) -> Result<Atom> {
    let reply = conn.wait_for_reply(conn.send_request(&InternAtom {
        only_if_exists: false,
        name,
    }))?;
    Ok(reply.atom())
}

fn get_active_window(conn: &Connection, root: Window, active_window_atom: Atom) -> Result<Option<Window>> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window: root,
        property: active_window_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    let windows = result.value::<Window>();
    match windows.first() {
        Some(window) if !window.is_none() => Ok(Some(*window)),
        _ => Ok(None),
    }
}

fn get_window_title(conn: &Connection, window: Window, wm_name_atom: Atom) -> Result<Option<String>> {
    let reply = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window,
        property: wm_name_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1024,
    }))?;
    if reply.value::<u8>().is_empty() {
        return Ok(None);
    }
    Ok(Some(String::from_utf8_lossy(reply.value()).into_owned()))
}

fn get_window_pid(conn: &Connection, window: Window, pid_atom: Atom) -> Result<Option<u32>> {
    let result = conn.wait_for_reply(conn.send_request(&GetProperty {
        delete: false,
        window,
        property: pid_atom,
        r#type: ATOM_ANY,
        long_offset: 0,
        long_length: 1,
    }))?;
    Ok(result.value::<u32>().first().copied())
}

/// Reads the short command name the kernel keeps for a process.
fn get_process_name(pid: u32) -> Option<String> {
    fs::read_to_string(format!("/proc/{pid}/comm"))
        .ok()
        .map(|name| name.trim_end().to_string())
}

pub struct X11FocusProbe {
    connection: Connection,
    preferred_screen: i32,
    active_window_atom: Atom,
    window_name_atom: Atom,
    pid_atom: Atom,
}

impl X11FocusProbe {
    pub fn new() -> Result<Self> {
        let (connection, preferred_screen) = xcb::Connection::connect(None)?;
        let active_window_atom = intern_atom(&connection, b"_NET_ACTIVE_WINDOW")?;
        let window_name_atom = intern_atom(&connection, b"_NET_WM_NAME")?;
        let pid_atom = intern_atom(&connection, b"_NET_WM_PID")?;
        Ok(Self {
            connection,
            preferred_screen,
            active_window_atom,
            window_name_atom,
            pid_atom,
        })
    }
}

impl FocusProbe for X11FocusProbe {
    #[instrument(skip(self))]
    fn poll(&mut self) -> Result<Option<FocusSnapshot>> {
        let setup = self.connection.get_setup();

        // Currently the application only supports 1 x11 screen.
        let root = setup
            .roots()
            .nth(self.preferred_screen.max(0) as usize)
            .expect("preferred screen should exist")
            .root();

        let Some(active) = get_active_window(&self.connection, root, self.active_window_atom)?
        else {
            return Ok(None);
        };

        let title = get_window_title(&self.connection, active, self.window_name_atom)?;
        let owner_name = get_window_pid(&self.connection, active, self.pid_atom)?
            .and_then(get_process_name);

        Ok(Some(FocusSnapshot {
            title: title.map(Into::into),
            owner_name: owner_name.map(Into::into),
        }))
    }
}
