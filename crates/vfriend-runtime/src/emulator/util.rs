/// Best-effort real-time priority for the emulation thread.
///
/// Failures are expected when the process lacks the privilege and only logged.
#[cfg(any(target_os = "linux", target_os = "android"))]
pub(crate) fn try_raise_current_thread_priority() {
    unsafe {
        let mut param: libc::sched_param = std::mem::zeroed();
        param.sched_priority = libc::sched_get_priority_min(libc::SCHED_FIFO);
        let rc = libc::pthread_setschedparam(libc::pthread_self(), libc::SCHED_FIFO, &param);
        if rc == 0 {
            tracing::debug!("emulation thread running with SCHED_FIFO");
            return;
        }
        tracing::debug!(rc, "SCHED_FIFO unavailable, falling back to nice");

        let tid = libc::gettid() as libc::id_t;
        if libc::setpriority(libc::PRIO_PROCESS, tid, -2) != 0 {
            tracing::debug!("could not raise emulation thread priority");
        }
    }
}

#[cfg(any(target_os = "macos", target_os = "ios"))]
pub(crate) fn try_raise_current_thread_priority() {
    unsafe {
        let rc = libc::pthread_set_qos_class_self_np(
            libc::qos_class_t::QOS_CLASS_USER_INTERACTIVE,
            0,
        );
        if rc != 0 {
            tracing::debug!(rc, "could not raise emulation thread QoS class");
        }
    }
}

#[cfg(windows)]
pub(crate) fn try_raise_current_thread_priority() {
    use windows_sys::Win32::System::Threading::{
        GetCurrentThread, SetThreadPriority, THREAD_PRIORITY_TIME_CRITICAL,
    };

    unsafe {
        if SetThreadPriority(GetCurrentThread(), THREAD_PRIORITY_TIME_CRITICAL) == 0 {
            tracing::debug!("could not raise emulation thread priority");
        }
    }
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "macos",
    target_os = "ios",
    windows
)))]
pub(crate) fn try_raise_current_thread_priority() {}
