//! Wrapping callback-based services in promises and driving them from
//! linear code, the way an application would.

#[cfg(test)]
mod tests {
    use promise_chain::{chain, Callback, Continuation, Failure, Promise};
    use std::collections::HashSet;
    use std::sync::mpsc::{channel, Sender};
    use std::sync::{Arc, Mutex};
    use std::thread;

    #[derive(Debug, Clone, PartialEq)]
    struct User {
        full_name: String,
        customer_id: String,
    }

    type Job = Box<dyn FnOnce() + Send>;

    /// A callback-style DAO running its lookups on a small worker pool.
    struct AsyncUserDao {
        jobs: Sender<Job>,
        workers: Vec<thread::JoinHandle<()>>,
    }

    impl AsyncUserDao {
        fn new(threads: usize) -> Self {
            let (jobs, rx) = channel::<Job>();
            let rx = Arc::new(Mutex::new(rx));
            let workers = (0..threads)
                .map(|_| {
                    let rx = rx.clone();
                    thread::spawn(move || loop {
                        let job = rx.lock().unwrap().recv();
                        match job {
                            Ok(job) => job(),
                            Err(_) => return,
                        }
                    })
                })
                .collect();
            Self { jobs, workers }
        }

        fn find_user_by_id<C>(&self, id: u32, callback: C)
        where
            C: Callback<User> + Send + 'static,
        {
            self.submit(move || {
                let _ = callback.success(User {
                    full_name: format!("Esteemed customer {id}"),
                    customer_id: id.to_string(),
                });
            });
        }

        fn get_status<C>(&self, full_name: String, callback: C)
        where
            C: Callback<bool> + Send + 'static,
        {
            self.submit(move || {
                let _ = match full_name.rsplit(' ').next().map(str::parse::<u32>) {
                    Some(Ok(id)) => callback.success(id % 2 == 0),
                    _ => callback.error(Failure::msg(format!("bad name {full_name}"))),
                };
            });
        }

        fn submit(&self, job: impl FnOnce() + Send + 'static) {
            let _ = self.jobs.send(Box::new(job));
        }

        fn shutdown(self) {
            drop(self.jobs);
            for worker in self.workers {
                worker.join().expect("The worker thread has panicked");
            }
        }
    }

    #[test]
    fn linear_code_over_a_threaded_legacy_service() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dao = Arc::new(AsyncUserDao::new(4));
        let seen = Arc::new(Mutex::new(HashSet::new()));

        let drivers: Vec<_> = (1..=4u32)
            .map(|driver| {
                let (dao, seen) = (dao.clone(), seen.clone());
                thread::spawn(move || {
                    for n in 0..25u32 {
                        let id = driver * 1000 + n;
                        let user = Promise::<User>::named("worker user");
                        dao.find_user_by_id(id, user.callback());

                        let status: Promise<bool> = {
                            let (dao, input) = (dao.clone(), user.clone());
                            chain(&user, move || {
                                let status = Promise::<bool>::named("status");
                                if let Ok(user) = input.get() {
                                    dao.get_status(user.full_name, status.callback());
                                }
                                status
                            })
                        };

                        let done = {
                            let (user, status_in, seen) = (user.clone(), status.clone(), seen.clone());
                            chain(
                                &status,
                                Continuation::new("verify", move || {
                                    let user = user.get().ok()?;
                                    let active = status_in.get().ok()?;
                                    let fresh = seen.lock().unwrap().insert(user.customer_id.clone());
                                    if user.full_name != format!("Esteemed customer {id}")
                                        || active != (id % 2 == 0)
                                        || !fresh
                                    {
                                        return Some(Err(Failure::msg(format!("wrong answer for {id}"))));
                                    }
                                    Some(Ok(()))
                                }),
                            )
                        };
                        done.wait().expect("verification failed");
                    }
                })
            })
            .collect();

        for driver in drivers {
            driver.join().expect("The driver thread has panicked");
        }
        assert_eq!(seen.lock().unwrap().len(), 100);
    }

    #[test]
    fn legacy_error_arm_fails_the_chain() {
        let dao = AsyncUserDao::new(1);
        let status = Promise::<bool>::named("status");
        dao.get_status("nobody".into(), status.callback());
        let err = status.wait().unwrap_err();
        assert_eq!(err.to_string(), "promise failed: bad name nobody");
        dao.shutdown();
    }

    /// A form whose button and fields are driven by the test, and whose
    /// display fields are filled in from promises.
    #[derive(Default)]
    struct LoginView {
        login: String,
        password: String,
        user_name: Mutex<Option<String>>,
        customer_id: Mutex<Option<String>>,
        status: Mutex<Option<String>>,
    }

    /// A service that answers only when the test tells it to.
    #[derive(Default)]
    struct ManualUserService {
        pending_user: Mutex<Vec<Box<dyn Fn(User) + Send>>>,
        pending_status: Mutex<Vec<Box<dyn Fn(bool) + Send>>>,
    }

    impl ManualUserService {
        fn get_user(&self, _login: &str, _password: &str) -> Promise<User> {
            let user = Promise::<User>::named("user");
            let callback = user.callback();
            self.pending_user.lock().unwrap().push(Box::new(move |u| {
                let _ = callback.success(u);
            }));
            user
        }

        fn get_status(&self, _user: &Promise<User>) -> Promise<bool> {
            let status = Promise::<bool>::named("status");
            let callback = status.callback();
            let pending = Box::new(move |active: bool| {
                let _ = callback.success(active);
            });
            self.pending_status.lock().unwrap().push(pending);
            status
        }

        fn resolve_get_user(&self, user: User) {
            for cb in self.pending_user.lock().unwrap().drain(..) {
                cb(user.clone());
            }
        }

        fn resolve_is_user_active(&self, active: bool) {
            for cb in self.pending_status.lock().unwrap().drain(..) {
                cb(active);
            }
        }
    }

    fn controller(service: Arc<ManualUserService>, view: Arc<LoginView>, clicked: &Promise<()>) {
        let on_click = {
            let clicked = clicked.clone();
            Continuation::new("on submit", move || {
                clicked.get().ok()?;
                let user = service.get_user(&view.login, &view.password);
                let shown = view.clone();
                user.when_available(
                    move |u| {
                        *shown.user_name.lock().unwrap() = Some(u.full_name.clone());
                        *shown.customer_id.lock().unwrap() = Some(u.customer_id.clone());
                    },
                    |_| {},
                );
                let status = service.get_status(&user);
                let shown = view.clone();
                status.when_available(
                    move |active| {
                        let text = if *active { "Active" } else { "Inactive" };
                        *shown.status.lock().unwrap() = Some(text.to_string());
                    },
                    |_| {},
                );
                Some(Ok(()))
            })
        };
        on_click.rerun_on(clicked);
    }

    #[test]
    fn reactive_login_form() {
        let service = Arc::new(ManualUserService::default());
        let view = Arc::new(LoginView {
            login: "login".into(),
            password: "password".into(),
            ..Default::default()
        });
        let clicked = Promise::<()>::named("login button");
        controller(service.clone(), view.clone(), &clicked);

        clicked.set(()).unwrap();
        assert_eq!(*view.user_name.lock().unwrap(), None);
        assert_eq!(*view.status.lock().unwrap(), None);

        service.resolve_get_user(User {
            full_name: "test user".into(),
            customer_id: "12345".into(),
        });
        assert_eq!(view.user_name.lock().unwrap().as_deref(), Some("test user"));
        assert_eq!(view.customer_id.lock().unwrap().as_deref(), Some("12345"));
        assert_eq!(*view.status.lock().unwrap(), None);

        service.resolve_is_user_active(true);
        assert_eq!(view.status.lock().unwrap().as_deref(), Some("Active"));
    }
}
