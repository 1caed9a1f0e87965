/// One input element paired with its position in the input sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem<R> {
    id: usize,
    resource: R,
}

impl<R> WorkItem<R> {
    pub(crate) fn new(id: usize, resource: R) -> Self {
        Self { id, resource }
    }

    /// 0-based index of the resource in the input sequence.
    #[inline]
    pub fn id(&self) -> usize {
        self.id
    }

    #[inline]
    pub fn resource(&self) -> &R {
        &self.resource
    }

    #[inline]
    pub fn into_resource(self) -> R {
        self.resource
    }
}

/// The result of processing one [`WorkItem`].
///
/// `error` is `Some` exactly when the processing function failed for
/// this item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<R, E> {
    item: WorkItem<R>,
    error: Option<E>,
}

impl<R, E> Outcome<R, E> {
    pub(crate) fn new(item: WorkItem<R>, result: Result<(), E>) -> Self {
        Self {
            item,
            error: result.err(),
        }
    }

    #[inline]
    pub fn item(&self) -> &WorkItem<R> {
        &self.item
    }

    #[inline]
    pub fn id(&self) -> usize {
        self.item.id
    }

    #[inline]
    pub fn resource(&self) -> &R {
        &self.item.resource
    }

    #[inline]
    pub fn error(&self) -> Option<&E> {
        self.error.as_ref()
    }

    #[inline]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn into_parts(self) -> (WorkItem<R>, Option<E>) {
        (self.item, self.error)
    }
}

/// Lifecycle of a [`Pool`](crate::pool::Pool).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PoolState {
    NotStarted = 0,
    Running = 1,
    Completed = 2,
    /// The run could not launch all of its threads.
    Aborted = 3,
}

impl PoolState {
    pub(crate) fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::NotStarted,
            1 => Self::Running,
            2 => Self::Completed,
            _ => Self::Aborted,
        }
    }
}
