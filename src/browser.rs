//! Ties input, debouncing, fetches and rendering together.
//!
//! [`Browser`] is a plain state machine: it turns [`Event`]s into
//! [`Effect`]s and never touches the network itself. [`run`] executes the
//! effects, spawning one task per fetch and feeding every result back into a
//! single event channel.

use std::collections::VecDeque;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use async_std::channel::{self, Receiver, Sender};
use async_std::task;
use tracing::{debug, info};

use unsplash_gallery_api_structs::{Photo, PhotoId};

use crate::api::{ApiError, Page, PhotoSource};
use crate::debounce::debounce;
use crate::query::{InfiniteQuery, PageRequest, DEFAULT_PER_PAGE};
use crate::render::{GalleryView, PhotoView, RenderError, Renderer};
use crate::selection::{PhotoDetail, Selection};

#[derive(Clone, Debug, PartialEq)]
pub enum OpenTarget {
    /// 1-based position in the gallery.
    Index(usize),
    Id(PhotoId),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Search(String),
    More,
    Open(OpenTarget),
    Close,
    Help,
    Quit,
    Unknown(String),
}

impl Command {
    /// Lines starting with `:` are commands, anything else is search input.
    pub fn parse(line: &str) -> Command {
        let line = line.trim_end_matches(|c: char| c == '\r' || c == '\n');
        let command = match line.strip_prefix(':') {
            Some(command) => command,
            None => return Command::Search(line.to_string()),
        };

        let mut words = command.split_whitespace();
        match (words.next(), words.next(), words.next()) {
            (Some("more"), None, _) => Command::More,
            (Some("open"), Some(target), None) => match target.parse::<usize>() {
                Ok(index) => Command::Open(OpenTarget::Index(index)),
                Err(_) => Command::Open(OpenTarget::Id(target.to_string())),
            },
            (Some("close"), None, _) => Command::Close,
            (Some("help"), None, _) => Command::Help,
            (Some("quit"), None, _) | (Some("q"), None, _) => Command::Quit,
            _ => Command::Unknown(line.to_string()),
        }
    }
}

#[derive(Debug)]
pub enum Event {
    Input(Command),
    SearchSettled(String),
    PageLoaded(PageRequest, Result<Page, ApiError>),
    DetailLoaded(PhotoId, Result<Photo, ApiError>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum View {
    Gallery(GalleryView),
    Photo(PhotoView),
    Help,
    Message(String),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Effect {
    Debounce(String),
    FetchPage(PageRequest),
    FetchDetail(PhotoId),
    Render(View),
    Quit,
}

#[derive(Debug)]
pub struct Browser {
    query: InfiniteQuery,
    selection: Selection,
    detail: PhotoDetail,
}

impl Default for Browser {
    fn default() -> Self {
        Browser::new(DEFAULT_PER_PAGE)
    }
}

impl Browser {
    /// `per_page` is the page size the source requests, used to spot the
    /// last page of the list endpoint.
    pub fn new(per_page: u8) -> Self {
        Browser {
            query: InfiniteQuery::new(None).with_page_size(per_page),
            selection: Selection::default(),
            detail: PhotoDetail::default(),
        }
    }

    pub fn query(&self) -> &InfiniteQuery {
        &self.query
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Requests the first page of the list endpoint.
    pub fn start(&mut self) -> Vec<Effect> {
        let mut effects = self.fetch_next_page();
        effects.push(self.current_view());
        effects
    }

    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match event {
            Event::Input(command) => self.handle_command(command),
            Event::SearchSettled(term) => {
                if !self.query.set_search_term(Some(&term)) {
                    return Vec::new();
                }
                let mut effects = self.fetch_next_page();
                if !self.selection.is_open() {
                    effects.push(self.gallery());
                }
                effects
            },
            Event::PageLoaded(request, result) => {
                if self.query.complete(&request, result) && !self.selection.is_open() {
                    vec![self.gallery()]
                } else {
                    Vec::new()
                }
            },
            Event::DetailLoaded(id, result) => {
                if self.detail.complete(&self.selection, &id, result) {
                    vec![self.photo()]
                } else {
                    Vec::new()
                }
            },
        }
    }

    fn handle_command(&mut self, command: Command) -> Vec<Effect> {
        match command {
            Command::Search(term) => vec![Effect::Debounce(term)],
            Command::More => match self.query.begin_fetch() {
                Some(request) => vec![Effect::FetchPage(request), self.current_view()],
                None if !self.query.has_more() => vec![message("No more photos.")],
                None => Vec::new(),
            },
            Command::Open(target) => {
                let id = match self.resolve(&target) {
                    Some(id) => id,
                    None => return vec![message(&format!("No photo {}.", describe(&target)))],
                };
                info!(photo_id = %id, "Opening photo");
                self.selection.open(id);
                let mut effects: Vec<_> = self
                    .detail
                    .begin_fetch(&self.selection)
                    .map(Effect::FetchDetail)
                    .into_iter()
                    .collect();
                effects.push(self.photo());
                effects
            },
            Command::Close => {
                self.selection.close();
                vec![self.gallery()]
            },
            Command::Help => vec![Effect::Render(View::Help)],
            Command::Quit => vec![Effect::Quit],
            Command::Unknown(line) => vec![message(&format!(
                "Unknown command {:?}, type :help for a list of commands.",
                line
            ))],
        }
    }

    fn fetch_next_page(&mut self) -> Vec<Effect> {
        self.query
            .begin_fetch()
            .map(Effect::FetchPage)
            .into_iter()
            .collect()
    }

    fn resolve(&self, target: &OpenTarget) -> Option<PhotoId> {
        match target {
            OpenTarget::Index(index) => index
                .checked_sub(1)
                .and_then(|i| self.query.photos().get(i).map(|photo| photo.id.clone())),
            OpenTarget::Id(id) => Some(id.clone()),
        }
    }

    fn gallery(&self) -> Effect {
        Effect::Render(View::Gallery(GalleryView::from(&self.query)))
    }

    fn photo(&self) -> Effect {
        Effect::Render(View::Photo(PhotoView::from(
            self.detail.state(&self.selection),
        )))
    }

    fn current_view(&self) -> Effect {
        if self.selection.is_open() {
            self.photo()
        } else {
            self.gallery()
        }
    }
}

fn message(text: &str) -> Effect {
    Effect::Render(View::Message(text.to_string()))
}

fn describe(target: &OpenTarget) -> String {
    match target {
        OpenTarget::Index(index) => format!("number {}", index),
        OpenTarget::Id(id) => format!("with id {}", id),
    }
}

fn render(renderer: &Renderer, view: View) -> Result<String, RenderError> {
    match view {
        View::Gallery(view) => renderer.gallery(&view),
        View::Photo(view) => renderer.photo(&view),
        View::Help => renderer.help(),
        View::Message(text) => Ok(text),
    }
}

fn spawn_page_fetch<S>(source: Arc<S>, request: PageRequest, events: Sender<Event>)
where
    S: PhotoSource + 'static,
{
    task::spawn(async move {
        let result = source
            .fetch_page(request.page, request.key.term.as_deref())
            .await;
        // The loop owns a sender too, so this only fails once it has exited.
        let _ = events.send(Event::PageLoaded(request, result)).await;
    });
}

fn spawn_detail_fetch<S>(source: Arc<S>, id: PhotoId, events: Sender<Event>)
where
    S: PhotoSource + 'static,
{
    task::spawn(async move {
        let result = source.fetch_photo(&id).await;
        let _ = events.send(Event::DetailLoaded(id, result)).await;
    });
}

/// Runs the browser until `:quit` or until `lines` is closed.
pub async fn run<S, W>(
    source: Arc<S>,
    renderer: &Renderer,
    lines: Receiver<String>,
    out: &mut W,
    per_page: u8,
    debounce_delay: Duration,
) -> Result<(), crate::Error>
where
    S: PhotoSource + 'static,
    W: Write,
{
    let (events_tx, events_rx) = channel::unbounded();

    let input_events = events_tx.clone();
    task::spawn(async move {
        while let Ok(line) = lines.recv().await {
            if input_events.send(Event::Input(Command::parse(&line))).await.is_err() {
                return;
            }
        }
        debug!("Input closed");
        let _ = input_events.send(Event::Input(Command::Quit)).await;
    });

    let (search_tx, search_rx) = channel::unbounded();
    let settled = debounce(search_rx, debounce_delay);
    let search_events = events_tx.clone();
    task::spawn(async move {
        while let Ok(term) = settled.recv().await {
            if search_events.send(Event::SearchSettled(term)).await.is_err() {
                return;
            }
        }
    });

    let mut browser = Browser::new(per_page);
    let mut effects: VecDeque<Effect> = browser.start().into();

    loop {
        while let Some(effect) = effects.pop_front() {
            match effect {
                Effect::Debounce(term) => {
                    // Only fails if the debounce task is gone, which ends input anyway.
                    let _ = search_tx.send(term).await;
                },
                Effect::FetchPage(request) => {
                    debug!(term = ?request.key.term, page = request.page, "Fetching page");
                    spawn_page_fetch(source.clone(), request, events_tx.clone());
                },
                Effect::FetchDetail(id) => {
                    debug!(photo_id = %id, "Fetching photo detail");
                    spawn_detail_fetch(source.clone(), id, events_tx.clone());
                },
                Effect::Render(view) => {
                    writeln!(out, "{}", render(renderer, view)?)?;
                    out.flush()?;
                },
                Effect::Quit => return Ok(()),
            }
        }

        match events_rx.recv().await {
            Ok(event) => effects.extend(browser.handle(event)),
            Err(_) => return Ok(()),
        }
    }
}
