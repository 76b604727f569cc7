//! `jsc_exports!`: JSC shells with the `JSObjectCallAsFunctionCallback` shape.

/// Declare JSC exports for one module.
///
/// Every shell takes `argc`/`argv`; arguments beyond `argc` read as
/// `undefined`. JS has no environment-free calls, so `direct` declarations
/// convert like plain ones.
///
/// ```ignore
/// hostbridge_backends::jsc_exports! {
///     context: MyJscContext,
///     module: InteropNativeModule,
///     registrar: register_interop,
///     exports: {
///         fn GetAnswer() -> KInt = answer;
///     }
/// }
/// ```
#[macro_export]
macro_rules! jsc_exports {
    (
        context: $ctx:ty,
        module: $module:ident,
        registrar: $registrar:ident,
        exports: { $($items:tt)* } $(,)?
    ) => {
        $crate::__export_items!(__jsc_shell item [$ctx, $module] $($items)*);

        pub fn $registrar(builder: &mut $crate::__private::ExportsBuilder) {
            $crate::__export_items!(__jsc_shell (register builder) [$ctx, $module] $($items)*);
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __jsc_shell {
    (item $variant:ident [$ctx:ty, $module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            #[allow(non_snake_case, unused_mut, unused_variables)]
            pub extern "C" fn [<jsc_ $module _ $name>](
                ctx: <$ctx as $crate::jsc::JscContext>::Raw,
                _function: <$ctx as $crate::jsc::JscContext>::Value,
                _this: <$ctx as $crate::jsc::JscContext>::Value,
                argc: usize,
                argv: *const <$ctx as $crate::jsc::JscContext>::Value,
                exception: *mut <$ctx as $crate::jsc::JscContext>::Value,
            ) -> <$ctx as $crate::jsc::JscContext>::Value {
                // SAFETY: the engine passes the calling context.
                let env = unsafe { <$ctx as $crate::jsc::JscContext>::from_raw(ctx) };
                $crate::__private::tracing::trace!(export = stringify!($name), argc, "jsc call");
                // SAFETY: the engine passes `argc` values at `argv`.
                let mut args = unsafe { $crate::jsc::arguments(argc, argv) }.iter().copied();
                $(
                    let $arg = args
                        .next()
                        .unwrap_or_else(|| <$ctx as $crate::jsc::JscContext>::undefined(env));
                )*
                let result = $crate::__jsc_invoke!($variant $ctx, env, $imp, ($($ty),*), [$($ret)?], ($($arg),*));
                $crate::jsc::finish_call(env, exception, result)
            }
        }
    };

    ((register $builder:ident) $variant:ident [$ctx:ty, $module:ident] $name:ident [$($arg:ident : $ty:ty),*] [$($ret:ty)?] $imp:path) => {
        $crate::__private::paste! {
            $crate::__register_export!($builder $variant $module $name [$($ty),*] [$($ret)?] [<jsc_ $module _ $name>]);
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __jsc_invoke {
    (context $ctx:ty, $env:ident, $imp:path, ($($ty:ty),*), [$($ret:ty)?], ($($arg:ident),*)) => {
        $crate::__private::InvokeWithContext::<$crate::jsc::Jsc<$ctx>, ($($ty,)*), $crate::__ret_ty!($($ret)?)>::invoke_with_context(
            &$imp,
            $env,
            ($($arg,)*),
        )
    };
    ($variant:ident $ctx:ty, $env:ident, $imp:path, ($($ty:ty),*), [$($ret:ty)?], ($($arg:ident),*)) => {
        $crate::__private::Invoke::<$crate::jsc::Jsc<$ctx>, ($($ty,)*), $crate::__ret_ty!($($ret)?)>::invoke(
            &$imp,
            $env,
            ($($arg,)*),
        )
    };
}
