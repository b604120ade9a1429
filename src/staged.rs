//! Staged edits: change a scratch copy, commit or discard it as a whole

use chrono::{Datelike, NaiveDate};

/// Committed value plus a scratch buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Staged<T> {
    committed: T,
    temp: T,
    open: bool,
}

impl<T: Clone> Staged<T> {
    pub fn new(committed: T) -> Self {
        Self {
            temp: committed.clone(),
            committed,
            open: false,
        }
    }

    pub fn committed(&self) -> &T {
        &self.committed
    }

    /// Value shown in the editor
    pub fn temp(&self) -> &T {
        &self.temp
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Replace the committed value from outside; ignored while open
    pub fn rebase(&mut self, committed: T) {
        if !self.open {
            self.temp = committed.clone();
            self.committed = committed;
        }
    }

    pub fn open(&mut self) {
        self.temp = self.committed.clone();
        self.open = true;
    }

    /// Change the scratch buffer; no-op when closed
    pub fn edit(&mut self, f: impl FnOnce(&mut T)) -> bool {
        if !self.open {
            return false;
        }
        f(&mut self.temp);
        true
    }

    pub fn set(&mut self, value: T) -> bool {
        self.edit(|t| *t = value)
    }

    /// Commit the buffer. `None` if the editor was not open.
    pub fn confirm(&mut self) -> Option<T> {
        if !self.open {
            return None;
        }
        self.committed = self.temp.clone();
        self.open = false;
        Some(self.committed.clone())
    }

    pub fn cancel(&mut self) {
        self.temp = self.committed.clone();
        self.open = false;
    }
}

/// Month shown by the date picker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarView {
    /// 1..=12
    pub month: u32,
    pub year: i32,
}

impl CalendarView {
    pub fn of(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            year: date.year(),
        }
    }
}

/// Visa deadline picker
///
/// Only dates from `today` up to the event date can be picked.
#[derive(Debug, Clone)]
pub struct VisaDateEditor {
    staged: Staged<Option<NaiveDate>>,
    view: CalendarView,
    today: NaiveDate,
    latest: NaiveDate,
}

impl VisaDateEditor {
    pub fn new(committed: Option<NaiveDate>, today: NaiveDate, latest: NaiveDate) -> Self {
        Self {
            staged: Staged::new(committed),
            view: CalendarView::of(today),
            today,
            latest,
        }
    }

    pub fn is_open(&self) -> bool {
        self.staged.is_open()
    }

    /// Date highlighted in the picker
    pub fn selected(&self) -> NaiveDate {
        self.staged.temp().unwrap_or(self.today)
    }

    pub fn view(&self) -> CalendarView {
        self.view
    }

    pub fn is_selectable(&self, date: NaiveDate) -> bool {
        date >= self.today && date <= self.latest
    }

    /// Open on the record's current value
    pub fn open(&mut self, committed: Option<NaiveDate>) {
        self.staged.rebase(committed);
        self.staged.open();
    }

    pub fn select(&mut self, date: NaiveDate) -> bool {
        if !self.is_selectable(date) {
            tracing::debug!(%date, "visa date outside selectable range");
            return false;
        }
        self.staged.set(Some(date))
    }

    pub fn change_month(&mut self, month: u32, year: i32) {
        if (1..=12).contains(&month) {
            self.view = CalendarView { month, year };
        }
    }

    /// Commit and close; returns the value to store on the record
    pub fn confirm(&mut self) -> Option<Option<NaiveDate>> {
        let value = self.staged.confirm()?;
        self.view = CalendarView::of(value.unwrap_or(self.today));
        Some(value)
    }

    pub fn cancel(&mut self) {
        self.staged.cancel();
        self.view = CalendarView::of(self.today);
    }
}
